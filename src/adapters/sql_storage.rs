// SQLストレージ
//
// 適用済み記録をデータベースの履歴テーブルに保存するストレージアダプター。
// データベース固有のSQL構文を抽象化し、接続プールをステップの追加引数として提供します。

use crate::adapters::database::DatabaseConnectionService;
use crate::adapters::storage::StorageAdapter;
use crate::core::config::{DatabaseConfig, Dialect};
use crate::core::error::StorageError;
use crate::core::migration::{AppliedRecord, CallArgument, Category, ModuleRef};
use crate::core::naming::MIGRATIONS_TABLE;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{AnyPool, Row};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

/// SQLストレージ
///
/// 接続は初回利用時に確立され、以後同じプールを再利用します。
#[derive(Debug)]
pub struct SqlStorage {
    dialect: Dialect,
    config: DatabaseConfig,
    pool: OnceCell<AnyPool>,
}

impl SqlStorage {
    /// 設定から遅延接続するSqlStorageを作成
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            dialect: config.dialect,
            config,
            pool: OnceCell::new(),
        }
    }

    /// 接続プールを取得（未接続なら接続）
    pub async fn pool(&self) -> Result<&AnyPool, StorageError> {
        self.pool
            .get_or_try_init(|| async {
                debug!(dialect = %self.config.dialect, "Connecting migration storage");
                DatabaseConnectionService::new()
                    .create_pool(&self.config)
                    .await
            })
            .await
    }

    /// 履歴テーブル作成SQLを生成
    pub fn generate_create_table_sql(&self) -> String {
        match self.dialect {
            Dialect::PostgreSQL => format!(
                r#"CREATE TABLE IF NOT EXISTS {} (
    id BIGSERIAL PRIMARY KEY,
    module VARCHAR(255) NOT NULL,
    category VARCHAR(16) NOT NULL,
    name VARCHAR(255) NOT NULL,
    duration_ms DOUBLE PRECISION NOT NULL DEFAULT 0,
    applied_at VARCHAR(64) NOT NULL
)"#,
                MIGRATIONS_TABLE
            ),
            Dialect::MySQL => format!(
                r#"CREATE TABLE IF NOT EXISTS {} (
    id BIGINT AUTO_INCREMENT PRIMARY KEY,
    module VARCHAR(255) NOT NULL,
    category VARCHAR(16) NOT NULL,
    name VARCHAR(255) NOT NULL,
    duration_ms DOUBLE NOT NULL DEFAULT 0,
    applied_at VARCHAR(64) NOT NULL
)"#,
                MIGRATIONS_TABLE
            ),
            Dialect::SQLite => format!(
                r#"CREATE TABLE IF NOT EXISTS {} (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    module TEXT NOT NULL,
    category TEXT NOT NULL,
    name TEXT NOT NULL,
    duration_ms REAL NOT NULL DEFAULT 0,
    applied_at TEXT NOT NULL
)"#,
                MIGRATIONS_TABLE
            ),
        }
    }

    /// 履歴テーブル存在確認SQLを生成
    pub fn generate_table_exists_sql(&self) -> String {
        match self.dialect {
            Dialect::PostgreSQL => {
                "SELECT table_name FROM information_schema.tables WHERE table_name = $1".to_string()
            }
            Dialect::MySQL => "SELECT table_name FROM information_schema.tables WHERE table_schema = DATABASE() AND table_name = ?".to_string(),
            Dialect::SQLite => {
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?".to_string()
            }
        }
    }

    /// 適用済み記録取得SQLを生成（適用順）
    pub fn generate_list_sql(&self) -> String {
        format!(
            "SELECT module, category, name, duration_ms FROM {} ORDER BY id",
            MIGRATIONS_TABLE
        )
    }

    /// 適用済み記録追加のINSERT SQLとパラメータを生成
    pub fn generate_record_query(&self, record: &AppliedRecord) -> (String, Vec<String>) {
        let placeholders = match self.dialect {
            Dialect::PostgreSQL => "$1, $2, $3, $4",
            Dialect::MySQL | Dialect::SQLite => "?, ?, ?, ?",
        };
        let sql = format!(
            "INSERT INTO {} (module, category, name, applied_at, duration_ms) VALUES ({}, {})",
            MIGRATIONS_TABLE,
            placeholders,
            match self.dialect {
                Dialect::PostgreSQL => "$5",
                Dialect::MySQL | Dialect::SQLite => "?",
            }
        );
        let params = vec![
            record.module.to_string(),
            record.category.to_string(),
            record.name.clone(),
            Utc::now().to_rfc3339(),
        ];
        (sql, params)
    }

    /// 適用済み記録削除のDELETE SQLを生成
    pub fn generate_remove_sql(&self) -> String {
        let condition = match self.dialect {
            Dialect::PostgreSQL => "module = $1 AND category = $2 AND name = $3",
            Dialect::MySQL | Dialect::SQLite => "module = ? AND category = ? AND name = ?",
        };
        format!("DELETE FROM {} WHERE {}", MIGRATIONS_TABLE, condition)
    }

    async fn ensure_table(&self, pool: &AnyPool) -> Result<(), StorageError> {
        let sql = self.generate_create_table_sql();
        sqlx::query(&sql)
            .execute(pool)
            .await
            .map_err(|e| StorageError::Query {
                message: format!("マイグレーション履歴テーブルの作成に失敗しました: {}", e),
                sql: Some(sql),
            })?;
        Ok(())
    }
}

fn parse_category(value: &str) -> Result<Category, StorageError> {
    match value {
        "schema" => Ok(Category::Schema),
        "data" => Ok(Category::Data),
        other => Err(StorageError::Serialization {
            message: format!("Unknown migration category in storage: {}", other),
        }),
    }
}

#[async_trait]
impl StorageAdapter for SqlStorage {
    async fn is_initialized(&self) -> Result<bool, StorageError> {
        let pool = self.pool().await?;
        let sql = self.generate_table_exists_sql();

        let row = sqlx::query(&sql)
            .bind(MIGRATIONS_TABLE)
            .fetch_optional(pool)
            .await
            .map_err(|e| StorageError::Query {
                message: format!("マイグレーションテーブルの存在確認に失敗しました: {}", e),
                sql: Some(sql),
            })?;

        Ok(row.is_some())
    }

    async fn list_applied(&self) -> Result<Vec<AppliedRecord>, StorageError> {
        let pool = self.pool().await?;
        let sql = self.generate_list_sql();

        let rows = sqlx::query(&sql)
            .fetch_all(pool)
            .await
            .map_err(|e| StorageError::Query {
                message: format!("マイグレーション履歴の取得に失敗しました: {}", e),
                sql: Some(sql),
            })?;

        rows.iter()
            .map(|row| {
                let module: String = row.get(0);
                let category: String = row.get(1);
                let name: String = row.get(2);
                let duration_ms: f64 = row.get(3);

                Ok(AppliedRecord::new(
                    ModuleRef::new(module),
                    parse_category(&category)?,
                    name,
                    duration_ms,
                ))
            })
            .collect()
    }

    async fn record_applied(&self, record: &AppliedRecord) -> Result<(), StorageError> {
        let pool = self.pool().await?;
        self.ensure_table(pool).await?;

        let (sql, params) = self.generate_record_query(record);
        let mut query = sqlx::query(&sql);
        for param in &params {
            query = query.bind(param);
        }
        query = query.bind(record.duration_ms);

        query.execute(pool).await.map_err(|e| StorageError::Query {
            message: format!("マイグレーション記録の保存に失敗しました: {}", e),
            sql: Some(sql.clone()),
        })?;

        Ok(())
    }

    async fn remove_applied(
        &self,
        module: &ModuleRef,
        name: &str,
        category: Category,
    ) -> Result<(), StorageError> {
        let pool = self.pool().await?;
        let sql = self.generate_remove_sql();

        sqlx::query(&sql)
            .bind(module.as_str())
            .bind(category.to_string())
            .bind(name)
            .execute(pool)
            .await
            .map_err(|e| StorageError::Query {
                message: format!("マイグレーション記録の削除に失敗しました: {}", e),
                sql: Some(sql.clone()),
            })?;

        Ok(())
    }

    async fn call_arguments(&self) -> Result<Vec<CallArgument>, StorageError> {
        let pool = self.pool().await?;
        Ok(vec![Arc::new(pool.clone()) as CallArgument])
    }
}
