// エラー型定義
//
// マイグレーションエンジン全体で使用されるカスタムエラー型を提供します。
// thiserrorを使用して、VersionError, StorageError, ConfigError, MigrateError, RunFailure を定義します。

use crate::core::migration::{Category, Method, MigrationOutcome};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// バージョン解析エラー
///
/// マイグレーション名が`MAJOR.MINOR.PATCH-label`形式に一致しない場合に発生します。
/// ディスカバリー境界で除外に使われ、呼び出し元へは伝播しません。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// Invalid migration name
    #[error("Invalid migration name '{name}': expected MAJOR.MINOR.PATCH-label")]
    InvalidFormat {
        /// 対象の名前
        name: String,
    },
}

impl VersionError {
    /// 形式エラーかどうか
    pub fn is_invalid_format(&self) -> bool {
        matches!(self, VersionError::InvalidFormat { .. })
    }
}

/// ストレージエラー
///
/// ストレージアダプターの操作時に発生するエラーを表現します。
#[derive(Debug, Error)]
pub enum StorageError {
    /// File I/O error
    #[error("Storage I/O error: {path} (cause: {cause})")]
    Io {
        /// ファイルパス
        path: String,
        /// エラー原因
        cause: String,
    },

    /// Serialization error
    #[error("Storage serialization error: {message}")]
    Serialization {
        /// エラーメッセージ
        message: String,
    },

    /// Connection error
    #[error("Storage connection error: {message} (cause: {cause})")]
    Connection {
        /// エラーメッセージ
        message: String,
        /// エラー原因
        cause: String,
    },

    /// Query execution error
    #[error("Storage query error: {message}")]
    Query {
        /// エラーメッセージ
        message: String,
        /// 失敗したSQL
        sql: Option<String>,
    },

    /// A step needs a call argument the active storage does not provide
    #[error("Missing call argument: {expected} is not provided by the active storage")]
    MissingCallArgument {
        /// 必要な引数の種類
        expected: String,
    },
}

impl StorageError {
    /// I/Oエラーかどうか
    pub fn is_io(&self) -> bool {
        matches!(self, StorageError::Io { .. })
    }

    /// シリアライズエラーかどうか
    pub fn is_serialization(&self) -> bool {
        matches!(self, StorageError::Serialization { .. })
    }

    /// 接続エラーかどうか
    pub fn is_connection(&self) -> bool {
        matches!(self, StorageError::Connection { .. })
    }

    /// クエリエラーかどうか
    pub fn is_query(&self) -> bool {
        matches!(self, StorageError::Query { .. })
    }

    /// 追加引数不足エラーかどうか
    pub fn is_missing_call_argument(&self) -> bool {
        matches!(self, StorageError::MissingCallArgument { .. })
    }
}

/// 設定エラー
///
/// モジュール定義の依存関係を解決する際に発生するエラーを表現します。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Module declared twice
    #[error("Module '{module}' is declared more than once")]
    DuplicateModule {
        /// モジュール名
        module: String,
    },

    /// Dependency on an undeclared module
    #[error("Module '{module}' depends on unknown module '{dependency}'")]
    UnknownDependency {
        /// モジュール名
        module: String,
        /// 見つからない依存先
        dependency: String,
    },

    /// Circular dependency
    #[error("Circular module dependency detected: {}", modules.join(", "))]
    DependencyCycle {
        /// 循環に含まれるモジュール
        modules: Vec<String>,
    },
}

/// 自動ロールバックの結果
///
/// 実行失敗時に試みた補償処理の結果を、元の失敗とは区別して保持します。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RollbackOutcome {
    /// 自動ロールバックが無効
    Disabled,
    /// 逆方向の操作が定義されていない
    Unavailable,
    /// 補償処理が成功した
    Succeeded,
    /// 補償処理も失敗した
    Failed {
        /// エラー原因
        cause: String,
    },
}

impl fmt::Display for RollbackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollbackOutcome::Disabled => write!(f, "rollback disabled"),
            RollbackOutcome::Unavailable => write!(f, "rollback unavailable"),
            RollbackOutcome::Succeeded => write!(f, "rollback succeeded"),
            RollbackOutcome::Failed { cause } => write!(f, "rollback failed: {}", cause),
        }
    }
}

/// マイグレーションエラー
///
/// up / down / status の実行時に呼び出し元へ伝播するエラーを表現します。
#[derive(Debug, Error)]
pub enum MigrateError {
    /// Invalid count parameter
    #[error("Invalid count parameter: {requested} ({reason})")]
    InvalidCount {
        /// 指定された値
        requested: String,
        /// 不正な理由
        reason: String,
    },

    /// Malformed migration body
    #[error("Invalid migration {path}: {reason}")]
    InvalidMigration {
        /// マイグレーションのパス
        path: String,
        /// 不正な理由
        reason: String,
    },

    /// Applied record without a discoverable artifact
    #[error("Applied migration not found: {module}/{category}/{name}")]
    MissingArtifact {
        /// モジュール名
        module: String,
        /// カテゴリ
        category: Category,
        /// マイグレーション名
        name: String,
    },

    /// Step execution failure
    #[error("Execution failed ({method}) for {path}: {cause} ({rollback})")]
    Execution {
        /// マイグレーションのパス
        path: String,
        /// 実行メソッド
        method: Method,
        /// 元の失敗原因
        cause: String,
        /// 補償処理の結果
        rollback: RollbackOutcome,
    },

    /// Unknown storage key
    #[error("Invalid storage key: {key}")]
    UnknownStorage {
        /// ストレージキー
        key: String,
    },

    /// No storage key given and no default configured
    #[error("No storage found: specify --storage or set migrate.storage in the config")]
    NoDefaultStorage,

    /// Migration discovery failure
    #[error("Failed to discover migrations: {message} (cause: {cause})")]
    Discovery {
        /// エラーメッセージ
        message: String,
        /// エラー原因
        cause: String,
    },

    /// Storage adapter failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Module configuration failure
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl MigrateError {
    /// 件数指定エラーかどうか
    pub fn is_invalid_count(&self) -> bool {
        matches!(self, MigrateError::InvalidCount { .. })
    }

    /// マイグレーション定義エラーかどうか
    pub fn is_invalid_migration(&self) -> bool {
        matches!(self, MigrateError::InvalidMigration { .. })
    }

    /// 対応するマイグレーションが見つからないエラーかどうか
    pub fn is_missing_artifact(&self) -> bool {
        matches!(self, MigrateError::MissingArtifact { .. })
    }

    /// 実行エラーかどうか
    pub fn is_execution(&self) -> bool {
        matches!(self, MigrateError::Execution { .. })
    }

    /// ストレージ解決エラーかどうか
    pub fn is_storage_resolution(&self) -> bool {
        matches!(
            self,
            MigrateError::UnknownStorage { .. } | MigrateError::NoDefaultStorage
        )
    }

    /// 実行エラーのロールバック結果を取得
    pub fn rollback_outcome(&self) -> Option<&RollbackOutcome> {
        match self {
            MigrateError::Execution { rollback, .. } => Some(rollback),
            _ => None,
        }
    }
}

/// up / down の失敗
///
/// 失敗前に完了したマイグレーションの結果を保持します。
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunFailure {
    /// 失敗前に完了した結果（実行順）
    pub completed: Vec<MigrationOutcome>,
    /// 失敗の原因
    #[source]
    pub error: MigrateError,
}

impl RunFailure {
    /// 完了済みの結果とエラーからRunFailureを作成
    pub fn new(completed: Vec<MigrationOutcome>, error: MigrateError) -> Self {
        Self { completed, error }
    }
}

impl From<MigrateError> for RunFailure {
    fn from(error: MigrateError) -> Self {
        Self::new(Vec::new(), error)
    }
}

/// 永続化警告
///
/// ステップの実行は成功したが、適用状態の記録に失敗した場合の警告です。
/// 適用済みセットと実際の効果が食い違う可能性があるため、結果に添付して表示します。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistenceWarning {
    /// マイグレーションのパス
    pub path: String,
    /// 実行メソッド
    pub method: Method,
    /// エラー原因
    pub cause: String,
}

impl PersistenceWarning {
    /// 新しい警告を作成
    pub fn new(path: String, method: Method, cause: String) -> Self {
        Self {
            path,
            method,
            cause,
        }
    }

    /// 警告メッセージをフォーマット
    pub fn format(&self) -> String {
        format!(
            "Warning: {} executed but its state could not be saved ({}): {}",
            self.path, self.method, self.cause
        )
    }
}
