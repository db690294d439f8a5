// 命名ポリシー
//
// 設定ファイル名、ディレクトリ、テーブル名、イベント名の単一ソースを提供します。

/// 既定の設定ファイル名
pub const CONFIG_FILE: &str = ".stratum.yaml";

/// モジュール内のスキーママイグレーションディレクトリ
pub const SCHEMA_MIGRATIONS_DIR: &str = "migrations/schemas";

/// モジュール内のデータマイグレーションディレクトリ
pub const DATA_MIGRATIONS_DIR: &str = "migrations/data";

/// SQLストレージの履歴テーブル名
pub const MIGRATIONS_TABLE: &str = "stratum_migrations";

/// マイグレーション実行前に発行されるイベント名
pub const BEFORE_EXECUTE_EVENT: &str = "stratum:before-execute";

/// マイグレーション実行後に発行されるイベント名
pub const AFTER_EXECUTE_EVENT: &str = "stratum:after-execute";

/// コマンドステップに渡される環境名の環境変数
pub const ENV_VAR: &str = "STRATUM_ENV";
