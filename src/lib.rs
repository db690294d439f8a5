// Stratumマイグレーションライブラリのエントリーポイント
//
// モジュール構造:
// - cli: CLIレイヤー（ユーザー入力の受付とコマンドルーティング）
// - core: コアドメインモデル（バージョン、マイグレーション、設定、エラー）
// - adapters: ストレージバックエンドとデータベース接続
// - services: ディスカバリー、依存順序、未適用解決、実行エンジン

pub mod adapters;
pub mod cli;
pub mod core;
pub mod services;
