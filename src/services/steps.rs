// マイグレーションステップ
//
// マイグレーションマニフェスト（YAML）の定義と、そこから生成される実行可能ステップ。
// - SQLステップ: ストレージが提供する接続プール上でトランザクション実行
// - コマンドステップ: プロジェクトディレクトリで外部コマンドを実行

use crate::core::error::StorageError;
use crate::core::migration::{CallArgument, Environment, MigrationBody, MigrationStep, Operation};
use crate::core::naming::ENV_VAR;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use sqlx::AnyPool;
use std::sync::Arc;
use tokio::process::Command;
use tracing::debug;

/// マイグレーションマニフェスト
///
/// ```yaml
/// up:
///   - CREATE TABLE users (id INTEGER PRIMARY KEY)
///   - command: ./scripts/seed.sh
///     args: [users]
/// down:
///   - DROP TABLE users
///   - command: ./scripts/unseed.sh
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MigrationManifest {
    #[serde(default)]
    pub up: Option<OperationSpec>,
    #[serde(default)]
    pub down: Option<OperationSpec>,
}

/// 操作の定義（単一ステップまたはステップの配列）
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OperationSpec {
    Sequence(Vec<StepSpec>),
    Single(StepSpec),
}

/// ステップの定義
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StepSpec {
    /// SQL文（`;`区切りで複数可）
    Sql(String),
    /// 外部コマンド
    Command {
        command: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl MigrationManifest {
    /// YAML文字列からマニフェストを解析
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_saphyr::from_str(content).with_context(|| "Failed to parse migration manifest")
    }

    /// 実行可能なマイグレーション本体へ変換
    ///
    /// 形状の検証は実行直前に行うため、ここでは変換のみを行います。
    pub fn into_body(self) -> MigrationBody {
        MigrationBody {
            up: self.up.map(OperationSpec::into_operation),
            down: self.down.map(OperationSpec::into_operation),
        }
    }
}

impl OperationSpec {
    fn into_operation(self) -> Operation {
        match self {
            OperationSpec::Single(step) => Operation::Single(step.into_step()),
            OperationSpec::Sequence(steps) => {
                Operation::Sequence(steps.into_iter().map(StepSpec::into_step).collect())
            }
        }
    }
}

impl StepSpec {
    fn into_step(self) -> Arc<dyn MigrationStep> {
        match self {
            StepSpec::Sql(sql) => Arc::new(SqlStep::new(sql)),
            StepSpec::Command { command, args } => Arc::new(CommandStep::new(command, args)),
        }
    }
}

/// SQLステップ
///
/// 追加引数のうち最初の`AnyPool`を使い、1トランザクション内で文を順に実行します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlStep {
    sql: String,
}

impl SqlStep {
    /// 新しいSQLステップを作成
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }
}

#[async_trait]
impl MigrationStep for SqlStep {
    async fn run(&self, _env: &Environment, args: &[CallArgument]) -> Result<()> {
        let pool = args
            .iter()
            .find_map(|arg| (**arg).downcast_ref::<AnyPool>())
            .ok_or_else(|| StorageError::MissingCallArgument {
                expected: "database connection (sql storage)".to_string(),
            })?;

        let mut tx = pool
            .begin()
            .await
            .with_context(|| "Failed to start transaction")?;

        for statement in split_sql_statements(&self.sql) {
            debug!(sql = %statement, "Executing migration statement");
            sqlx::query(&statement)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to execute SQL: {}", statement))?;
        }

        tx.commit()
            .await
            .with_context(|| "Failed to commit transaction")?;

        Ok(())
    }
}

/// コマンドステップ
///
/// プロジェクトルートを作業ディレクトリとし、環境名を`STRATUM_ENV`で渡します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandStep {
    program: String,
    args: Vec<String>,
}

impl CommandStep {
    /// 新しいコマンドステップを作成
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl MigrationStep for CommandStep {
    async fn run(&self, env: &Environment, _args: &[CallArgument]) -> Result<()> {
        debug!(program = %self.program, args = ?self.args, "Running migration command");

        let output = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&env.project_path)
            .env(ENV_VAR, &env.name)
            .output()
            .await
            .with_context(|| format!("Failed to spawn command: {}", self.program))?;

        if !output.status.success() {
            bail!(
                "Command '{}' exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(())
    }
}

/// 分割中の字句状態
#[derive(Debug, Clone, PartialEq, Eq)]
enum ScanState {
    Normal,
    Quoted(char),
    DollarQuoted(String),
    LineComment,
    /// ネスト深さ付きブロックコメント（PostgreSQL）
    BlockComment(u32),
}

/// SQLを文単位に分割
///
/// 引用符、ドル引用（`$tag$ ... $tag$`）、`--`行コメント、
/// `/* */`ブロックコメント内の`;`では分割しません。
/// コメントだけの文は結果から除外します。
pub(crate) fn split_sql_statements(sql: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = sql.char_indices().collect();
    let next_is = |i: usize, expected: char| chars.get(i + 1).map(|&(_, c)| c) == Some(expected);

    let mut statements = Vec::new();
    let mut current = String::new();
    let mut state = ScanState::Normal;
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];

        match state {
            ScanState::DollarQuoted(ref tag) => {
                if c == '$' && sql[pos..].starts_with(tag.as_str()) {
                    current.push_str(tag);
                    i += tag.chars().count();
                    state = ScanState::Normal;
                    continue;
                }
            }
            ScanState::Quoted(q) => {
                if c == q {
                    // 連続した引用符はエスケープ
                    if next_is(i, q) {
                        current.push(q);
                        current.push(q);
                        i += 2;
                        continue;
                    }
                    state = ScanState::Normal;
                }
            }
            ScanState::LineComment => {
                if c == '\n' {
                    state = ScanState::Normal;
                }
            }
            ScanState::BlockComment(depth) => {
                if c == '/' && next_is(i, '*') {
                    current.push_str("/*");
                    i += 2;
                    state = ScanState::BlockComment(depth + 1);
                    continue;
                }
                if c == '*' && next_is(i, '/') {
                    current.push_str("*/");
                    i += 2;
                    state = if depth == 1 {
                        ScanState::Normal
                    } else {
                        ScanState::BlockComment(depth - 1)
                    };
                    continue;
                }
            }
            ScanState::Normal => match c {
                '\'' | '"' => state = ScanState::Quoted(c),
                '-' if next_is(i, '-') => {
                    current.push_str("--");
                    i += 2;
                    state = ScanState::LineComment;
                    continue;
                }
                '/' if next_is(i, '*') => {
                    current.push_str("/*");
                    i += 2;
                    state = ScanState::BlockComment(1);
                    continue;
                }
                '$' => {
                    if let Some(tag) = dollar_tag_at(sql, pos) {
                        current.push_str(tag);
                        i += tag.chars().count();
                        state = ScanState::DollarQuoted(tag.to_string());
                        continue;
                    }
                }
                ';' => {
                    push_statement(&mut statements, &current);
                    current.clear();
                    i += 1;
                    continue;
                }
                _ => {}
            },
        }

        current.push(c);
        i += 1;
    }

    push_statement(&mut statements, &current);
    statements
}

/// `pos`から始まるドル引用タグ（`$$`または`$tag$`）を取得
fn dollar_tag_at(sql: &str, pos: usize) -> Option<&str> {
    let end = sql[pos + 1..].find('$')?;
    let tag = &sql[pos..=pos + end + 1];
    tag[1..tag.len() - 1]
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        .then_some(tag)
}

fn push_statement(statements: &mut Vec<String>, current: &str) {
    let trimmed = current.trim();
    if !trimmed.is_empty() && !is_comment_only(trimmed) {
        statements.push(trimmed.to_string());
    }
}

/// コメントを除くと空になる文かを判定
fn is_comment_only(statement: &str) -> bool {
    let mut rest = statement.trim_start();

    loop {
        if rest.is_empty() {
            return true;
        }
        if let Some(line) = rest.strip_prefix("--") {
            match line.find('\n') {
                Some(end) => rest = line[end + 1..].trim_start(),
                None => return true,
            }
        } else if let Some(block) = rest.strip_prefix("/*") {
            let mut depth = 1u32;
            let mut offset = 0;
            while depth > 0 {
                let tail = &block[offset..];
                if tail.is_empty() {
                    // 閉じていないコメント
                    return true;
                }
                if tail.starts_with("/*") {
                    depth += 1;
                    offset += 2;
                } else if tail.starts_with("*/") {
                    depth -= 1;
                    offset += 2;
                } else {
                    offset += tail.chars().next().map_or(1, char::len_utf8);
                }
            }
            rest = block[offset..].trim_start();
        } else {
            return false;
        }
    }
}
