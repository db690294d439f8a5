// ストレージアダプター契約
//
// 適用済みマイグレーションの照会と記録を行うバックエンドの共通インターフェース。
// エンジンはこのトレイトのみを保持し、バックエンドの内部には立ち入りません。

use crate::adapters::json_file_storage::JsonFileStorage;
use crate::adapters::sql_storage::SqlStorage;
use crate::core::config::{Dialect, StorageConfig};
use crate::core::error::StorageError;
use crate::core::migration::{AppliedRecord, CallArgument, Category, Environment, ModuleRef};
use async_trait::async_trait;
use std::sync::Arc;

/// ストレージアダプター
///
/// 同一インスタンスが呼び出しをまたいで再利用されるため、逐次的な再利用に
/// 耐える必要があります。並行利用への安全性は要求しません。
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// 追跡用の構造（ファイル、テーブルなど）が存在するかどうか
    ///
    /// falseの場合、適用済みセットは空とみなされ照会は行われません。
    async fn is_initialized(&self) -> Result<bool, StorageError>;

    /// 適用済み記録を適用順で取得
    async fn list_applied(&self) -> Result<Vec<AppliedRecord>, StorageError>;

    /// 適用済み記録を追加
    async fn record_applied(&self, record: &AppliedRecord) -> Result<(), StorageError>;

    /// 適用済み記録を削除
    async fn remove_applied(
        &self,
        module: &ModuleRef,
        name: &str,
        category: Category,
    ) -> Result<(), StorageError>;

    /// 各ステップへ環境の後ろに渡す追加引数
    async fn call_arguments(&self) -> Result<Vec<CallArgument>, StorageError> {
        Ok(Vec::new())
    }
}

/// ストレージアダプターのファクトリ
///
/// ストレージキーごとに登録され、初回利用時に一度だけ呼び出されます。
pub type StorageFactory =
    Arc<dyn Fn(&Environment) -> Result<Arc<dyn StorageAdapter>, StorageError> + Send + Sync>;

/// ストレージ設定からファクトリを作成
///
/// 相対パスはファクトリ呼び出し時の環境のプロジェクトルートを基準に解決します。
pub fn factory_for(config: StorageConfig) -> StorageFactory {
    Arc::new(
        move |env: &Environment| -> Result<Arc<dyn StorageAdapter>, StorageError> {
            match &config {
                StorageConfig::Json { path } => Ok(Arc::new(JsonFileStorage::new(
                    env.project_path.join(path),
                ))),
                StorageConfig::Sql(db_config) => {
                    let mut db_config = db_config.clone();
                    if db_config.dialect == Dialect::SQLite && db_config.database != ":memory:" {
                        db_config.database = env
                            .project_path
                            .join(&db_config.database)
                            .display()
                            .to_string();
                    }
                    Ok(Arc::new(SqlStorage::new(db_config)))
                }
            }
        },
    )
}
