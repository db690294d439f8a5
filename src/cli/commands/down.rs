// migrate downコマンドハンドラー
//
// 適用済みマイグレーションを新しい順に取り消します。

use crate::cli::command_context::CommandContext;
use crate::cli::commands::{render_output, run_failure_error, MigrationRunOutput};
use crate::cli::OutputFormat;
use crate::core::migration::parse_count;
use anyhow::Result;
use std::path::PathBuf;

/// migrate downコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct DownCommand {
    pub project_path: PathBuf,
    pub config_path: Option<PathBuf>,
    pub env: String,
    /// 取り消し件数（未指定なら全件）
    pub count: Option<String>,
    pub storage: Option<String>,
    pub format: OutputFormat,
}

/// migrate downコマンドハンドラー
#[derive(Debug, Clone, Default)]
pub struct DownCommandHandler {}

impl DownCommandHandler {
    /// 新しいDownCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// migrate downコマンドを実行
    pub async fn execute(&self, command: &DownCommand) -> Result<String> {
        let count = command.count.as_deref().map(parse_count).transpose()?;

        let context =
            CommandContext::load(command.project_path.clone(), command.config_path.clone())?;
        let service = context.migration_service(&command.env)?;

        let executed = service
            .down(count, command.storage.as_deref())
            .await
            .map_err(run_failure_error)?;

        render_output(&MigrationRunOutput { executed }, &command.format)
    }
}
