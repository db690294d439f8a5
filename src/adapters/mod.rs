// Adapters
// 適用履歴の永続化バックエンドとデータベース接続を抽象化

pub mod connection_string;
pub mod database;
pub mod json_file_storage;
pub mod sql_storage;
pub mod storage;
