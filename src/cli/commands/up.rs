// migrate upコマンドハンドラー
//
// 未適用マイグレーションを依存順に適用し、1件1行で結果を表示します。

use crate::cli::command_context::CommandContext;
use crate::cli::commands::{render_output, run_failure_error, MigrationRunOutput};
use crate::cli::OutputFormat;
use crate::core::migration::parse_count;
use anyhow::Result;
use std::path::PathBuf;

/// migrate upコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct UpCommand {
    /// プロジェクトのルートパス
    pub project_path: PathBuf,
    /// カスタム設定ファイルパス
    pub config_path: Option<PathBuf>,
    /// 環境名
    pub env: String,
    /// 適用件数（未指定なら全件）
    pub count: Option<String>,
    /// ストレージキー
    pub storage: Option<String>,
    /// 出力フォーマット
    pub format: OutputFormat,
}

/// migrate upコマンドハンドラー
#[derive(Debug, Clone, Default)]
pub struct UpCommandHandler {}

impl UpCommandHandler {
    /// 新しいUpCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// migrate upコマンドを実行
    pub async fn execute(&self, command: &UpCommand) -> Result<String> {
        // 件数は何かを実行する前に検証する
        let count = command.count.as_deref().map(parse_count).transpose()?;

        let context =
            CommandContext::load(command.project_path.clone(), command.config_path.clone())?;
        let service = context.migration_service(&command.env)?;

        let executed = service
            .up(count, command.storage.as_deref())
            .await
            .map_err(run_failure_error)?;

        render_output(&MigrationRunOutput { executed }, &command.format)
    }
}
