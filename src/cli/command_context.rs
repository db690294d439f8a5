// コマンド共通コンテキスト
//
// 設定ファイル読み込みとマイグレーションサービスの組み立てをCLI層で集約する。

use crate::core::config::Config;
use crate::core::migration::Environment;
use crate::services::config_loader::ConfigLoader;
use crate::services::events::TracingObserver;
use crate::services::migration_service::MigrationService;
use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// CLIコマンド共通の実行コンテキスト
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub project_path: PathBuf,
    pub config_path: PathBuf,
    pub config: Config,
}

impl CommandContext {
    /// 設定を読み込んでコンテキストを作成
    ///
    /// `config_path`が未指定の場合はプロジェクトルートの`.stratum.yaml`を使用します。
    pub fn load(project_path: PathBuf, config_path: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_path {
            Some(path) if path.is_absolute() => path,
            Some(path) => project_path.join(path),
            None => project_path.join(Config::DEFAULT_CONFIG_PATH),
        };
        if !config_path.exists() {
            return Err(anyhow!("Config file not found: {:?}", config_path));
        }

        let config =
            ConfigLoader::from_file(&config_path).with_context(|| "Failed to read config file")?;

        Ok(Self {
            project_path,
            config_path,
            config,
        })
    }

    /// 指定環境向けのマイグレーションサービスを作成
    pub fn migration_service(&self, env: &str) -> Result<MigrationService> {
        let environment = Environment::new(env, self.project_path.clone());
        let mut service = MigrationService::from_config(environment, &self.config)
            .with_context(|| "Failed to set up migration service")?;
        service.events_mut().on_execute(Arc::new(TracingObserver));
        Ok(service)
    }
}
