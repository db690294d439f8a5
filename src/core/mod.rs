// Core Domain
// バージョン解析、マイグレーションモデル、設定、エラー型の純粋なドメインロジック

pub mod config;
pub mod error;
pub mod migration;
pub mod naming;
pub mod version;
