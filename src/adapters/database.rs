// データベース接続アダプター
//
// SQLxを使用したデータベース接続の管理を行います。
// PostgreSQL、MySQL、SQLiteに対応した統一されたインターフェースを提供します。

use crate::adapters::connection_string::build_connection_string;
use crate::core::config::DatabaseConfig;
use crate::core::error::StorageError;
use sqlx::pool::PoolOptions;
use sqlx::{Any, AnyPool};
use std::time::Duration;

/// 既定の接続タイムアウト（秒）
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// データベース接続サービス
///
/// データベース接続プールの初期化を行います。
#[derive(Debug, Clone, Default)]
pub struct DatabaseConnectionService {}

impl DatabaseConnectionService {
    /// 新しいDatabaseConnectionServiceを作成
    pub fn new() -> Self {
        Self {}
    }

    /// データベース接続プールを作成
    ///
    /// # Arguments
    ///
    /// * `config` - データベース設定
    ///
    /// # Returns
    ///
    /// 接続プールまたはエラー
    pub async fn create_pool(&self, config: &DatabaseConfig) -> Result<AnyPool, StorageError> {
        sqlx::any::install_default_drivers();

        let connection_string = build_connection_string(config);

        self.create_pool_options(config.timeout)
            .connect(&connection_string)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("データベース接続プールの作成に失敗しました: {}", config.dialect),
                cause: e.to_string(),
            })
    }

    /// プールオプションを作成
    ///
    /// ステップは逐次実行されるため、接続は1本に制限します。
    /// SQLiteのインメモリデータベースも同一接続で共有されます。
    pub fn create_pool_options(&self, timeout_secs: Option<u64>) -> PoolOptions<Any> {
        let timeout = timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        PoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(timeout))
    }
}
