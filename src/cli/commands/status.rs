// migrate statusコマンドハンドラー
//
// 未適用マイグレーションを実行順に一覧表示します（副作用なし）。

use crate::cli::command_context::CommandContext;
use crate::cli::commands::{render_output, CommandOutput};
use crate::cli::OutputFormat;
use crate::core::migration::{Category, ExecutionPlanEntry, ModuleRef};
use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

/// statusコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct StatusCommand {
    /// プロジェクトのルートパス
    pub project_path: PathBuf,
    /// カスタム設定ファイルパス
    pub config_path: Option<PathBuf>,
    /// 環境名
    pub env: String,
    /// ストレージキー
    pub storage: Option<String>,
    /// 出力フォーマット
    pub format: OutputFormat,
}

/// 未適用マイグレーション1件
#[derive(Debug, Clone, Serialize)]
pub struct PendingMigration {
    pub module: ModuleRef,
    pub category: Category,
    pub name: String,
    pub path: String,
}

impl From<&ExecutionPlanEntry> for PendingMigration {
    fn from(entry: &ExecutionPlanEntry) -> Self {
        Self {
            module: entry.artifact.module.clone(),
            category: entry.category(),
            name: entry.artifact.relative_name.clone(),
            path: entry.artifact.display_path(),
        }
    }
}

/// statusコマンドの出力構造体
#[derive(Debug, Clone, Serialize)]
pub struct StatusOutput {
    pub pending: Vec<PendingMigration>,
}

impl CommandOutput for StatusOutput {
    fn to_text(&self) -> String {
        if self.pending.is_empty() {
            return "No pending migration.".to_string();
        }

        let mut output = format!("{} pending migrations:", self.pending.len());
        for migration in &self.pending {
            output.push('\n');
            output.push_str(&migration.path);
        }
        output
    }
}

/// statusコマンドハンドラー
#[derive(Debug, Clone, Default)]
pub struct StatusCommandHandler {}

impl StatusCommandHandler {
    /// 新しいStatusCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// statusコマンドを実行
    ///
    /// # Returns
    ///
    /// 未適用マイグレーションの一覧。なければ情報メッセージ
    pub async fn execute(&self, command: &StatusCommand) -> Result<String> {
        let context =
            CommandContext::load(command.project_path.clone(), command.config_path.clone())?;
        let service = context.migration_service(&command.env)?;

        let plan = service.status(command.storage.as_deref()).await?;
        let output = StatusOutput {
            pending: plan.iter().map(PendingMigration::from).collect(),
        };

        render_output(&output, &command.format)
    }
}
