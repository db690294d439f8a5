// コマンドハンドラー層
// 各CLIコマンドの実装と共通の出力処理

pub mod down;
pub mod status;
pub mod up;

use crate::cli::OutputFormat;
use crate::core::error::RunFailure;
use crate::core::migration::MigrationOutcome;
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

/// コマンド出力
pub trait CommandOutput: Serialize {
    /// テキスト形式の出力
    fn to_text(&self) -> String;
}

/// 指定フォーマットで出力を描画
pub fn render_output<T: CommandOutput>(output: &T, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(output.to_text()),
        OutputFormat::Json => {
            serde_json::to_string_pretty(output).with_context(|| "Failed to serialize output")
        }
    }
}

/// up / downの実行結果
#[derive(Debug, Clone, Serialize)]
pub struct MigrationRunOutput {
    pub executed: Vec<MigrationOutcome>,
}

impl CommandOutput for MigrationRunOutput {
    fn to_text(&self) -> String {
        format_outcomes(&self.executed)
    }
}

/// 実行結果を1件1行でフォーマット
pub fn format_outcomes(outcomes: &[MigrationOutcome]) -> String {
    let mut lines = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        lines.push(format!(
            "Migration executed in {}: {}.",
            outcome.duration_ms, outcome.path
        ));
        if let Some(warning) = &outcome.warning {
            lines.push(warning.format().yellow().to_string());
        }
    }
    lines.join("\n")
}

/// 途中で失敗した実行を、完了分を含むエラーに変換
pub fn run_failure_error(failure: RunFailure) -> anyhow::Error {
    if failure.completed.is_empty() {
        return failure.error.into();
    }

    let summary = format!(
        "Stopped after {} migration(s):\n{}",
        failure.completed.len(),
        format_outcomes(&failure.completed)
    );
    anyhow::Error::new(failure.error).context(summary)
}
