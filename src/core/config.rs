// 設定ファイル管理
//
// プロジェクトの設定ファイル（YAML形式）の読み込み、検証、
// モジュール定義とストレージ設定の管理を行います。

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

/// データベース方言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[serde(rename = "postgresql")]
    PostgreSQL,
    #[serde(rename = "mysql")]
    MySQL,
    #[serde(rename = "sqlite")]
    SQLite,
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::PostgreSQL => write!(f, "postgresql"),
            Dialect::MySQL => write!(f, "mysql"),
            Dialect::SQLite => write!(f, "sqlite"),
        }
    }
}

/// プロジェクト設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 設定ファイルのバージョン
    pub version: String,

    /// マイグレーション実行設定
    #[serde(default)]
    pub migrate: MigrateSettings,

    /// マイグレーションを提供するモジュール（宣言順）
    #[serde(default)]
    pub modules: Vec<ModuleConfig>,

    /// キー別のストレージ設定
    #[serde(default)]
    pub storages: HashMap<String, StorageConfig>,
}

impl Config {
    /// デフォルトの設定ファイルパス
    pub const DEFAULT_CONFIG_PATH: &'static str = crate::core::naming::CONFIG_FILE;

    /// 設定の妥当性を検証
    pub fn validate(&self) -> Result<()> {
        // バージョンチェック
        if self.version.is_empty() {
            return Err(anyhow!("Config file version is not specified"));
        }

        // 既定ストレージの存在チェック
        if let Some(storage) = &self.migrate.storage {
            if !self.storages.contains_key(storage) {
                return Err(anyhow!(
                    "Default storage '{}' is not defined in storages",
                    storage
                ));
            }
        }

        for module in &self.modules {
            if module.name.is_empty() {
                return Err(anyhow!("Module name is not specified"));
            }
        }

        // 各ストレージ設定を検証
        for (key, storage) in &self.storages {
            storage
                .validate()
                .with_context(|| format!("Invalid config for storage '{}'", key))?;
        }

        Ok(())
    }
}

/// std::str::FromStrトレイトの実装
impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(yaml: &str) -> Result<Self, Self::Err> {
        serde_saphyr::from_str(yaml).with_context(|| "Failed to parse config file")
    }
}

/// マイグレーション実行設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrateSettings {
    /// 既定のストレージキー
    #[serde(default)]
    pub storage: Option<String>,

    /// 実行失敗時に逆方向の操作を試みるかどうか
    #[serde(default = "default_roll_back")]
    pub roll_back: bool,
}

fn default_roll_back() -> bool {
    true
}

impl Default for MigrateSettings {
    fn default() -> Self {
        Self {
            storage: None,
            roll_back: default_roll_back(),
        }
    }
}

/// モジュール定義
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// モジュール名
    pub name: String,

    /// モジュールのディレクトリ（プロジェクトルートからの相対パス）
    pub path: PathBuf,

    /// 依存するモジュール名
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// ストレージ設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// JSONファイルに適用履歴を保存
    Json {
        /// ファイルパス（プロジェクトルートからの相対パス）
        path: PathBuf,
    },
    /// データベースのテーブルに適用履歴を保存
    Sql(DatabaseConfig),
}

impl StorageConfig {
    /// ストレージ設定を検証
    pub fn validate(&self) -> Result<()> {
        match self {
            StorageConfig::Json { path } => {
                if path.as_os_str().is_empty() {
                    return Err(anyhow!("Storage file path is not specified"));
                }
                Ok(())
            }
            StorageConfig::Sql(db_config) => db_config.validate(),
        }
    }
}

/// データベース接続設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// データベース方言
    pub dialect: Dialect,

    /// ホスト名（SQLiteの場合は不要）
    #[serde(default = "default_host")]
    pub host: String,

    /// ポート番号
    #[serde(default = "default_port")]
    pub port: u16,

    /// データベース名（SQLiteの場合はファイルパス）
    pub database: String,

    /// ユーザー名
    pub user: Option<String>,

    /// パスワード
    pub password: Option<String>,

    /// 接続タイムアウト（秒）
    pub timeout: Option<u64>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432 // PostgreSQLのデフォルトポート
}

impl DatabaseConfig {
    /// Validate database configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.is_empty() {
            return Err(anyhow!("Database name is not specified"));
        }

        Ok(())
    }
}
