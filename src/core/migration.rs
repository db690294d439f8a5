// マイグレーションドメインモデル
//
// モジュールが提供するマイグレーションと適用履歴を表現する型システム。
// ModuleRef, Category, MigrationArtifact, AppliedRecord, ExecutionPlanEntry などを提供します。

use crate::core::error::{MigrateError, PersistenceWarning, VersionError};
use crate::core::version::Version;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// モジュール識別子
///
/// マイグレーションを提供するモジュールを表す不変の識別子です。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleRef(String);

impl ModuleRef {
    /// 新しいモジュール識別子を作成
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// モジュール名を取得
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// マイグレーションカテゴリ
///
/// スキーマとデータは独立したバージョン系列を持ちます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Schema,
    Data,
}

impl Category {
    /// 解決時の固定順序（スキーマが先）
    pub const ORDERED: [Category; 2] = [Category::Schema, Category::Data];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Schema => write!(f, "schema"),
            Category::Data => write!(f, "data"),
        }
    }
}

/// 実行メソッド
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Up,
    Down,
}

impl Method {
    /// 逆方向のメソッド
    pub fn opposite(self) -> Self {
        match self {
            Method::Up => Method::Down,
            Method::Down => Method::Up,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Up => write!(f, "up"),
            Method::Down => write!(f, "down"),
        }
    }
}

/// ステップに渡される追加引数
///
/// ストレージアダプターが注入する任意の値（接続プールなど）です。
pub type CallArgument = Arc<dyn Any + Send + Sync>;

/// ホスト環境
///
/// すべてのステップへ最初の引数として渡されます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// 環境名（development, production など）
    pub name: String,
    /// プロジェクトのルートパス
    pub project_path: PathBuf,
}

impl Environment {
    /// 新しい環境を作成
    pub fn new(name: impl Into<String>, project_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            project_path: project_path.into(),
        }
    }
}

/// 実行可能なマイグレーションステップ
#[async_trait]
pub trait MigrationStep: Send + Sync + fmt::Debug {
    /// ステップを実行
    ///
    /// # Arguments
    ///
    /// * `env` - ホスト環境
    /// * `args` - ストレージアダプターが提供する追加引数（順序付き）
    async fn run(&self, env: &Environment, args: &[CallArgument]) -> anyhow::Result<()>;
}

/// マイグレーション操作
///
/// 単一ステップまたは順序付きステップ列のいずれかです。
#[derive(Debug, Clone)]
pub enum Operation {
    Single(Arc<dyn MigrationStep>),
    Sequence(Vec<Arc<dyn MigrationStep>>),
}

impl Operation {
    /// 実行順のステップ
    pub fn steps(&self) -> &[Arc<dyn MigrationStep>] {
        match self {
            Operation::Single(step) => std::slice::from_ref(step),
            Operation::Sequence(steps) => steps,
        }
    }

    /// 単一ステップかどうか
    pub fn is_single(&self) -> bool {
        matches!(self, Operation::Single(_))
    }

    /// 同じ形状（単一同士、または同じ長さのステップ列）かどうか
    pub fn same_shape(&self, other: &Operation) -> bool {
        match (self, other) {
            (Operation::Single(_), Operation::Single(_)) => true,
            (Operation::Sequence(a), Operation::Sequence(b)) => a.len() == b.len(),
            _ => false,
        }
    }
}

/// マイグレーション本体
#[derive(Debug, Clone, Default)]
pub struct MigrationBody {
    pub up: Option<Operation>,
    pub down: Option<Operation>,
}

impl MigrationBody {
    /// up / down 両方を指定して作成
    pub fn new(up: Operation, down: Option<Operation>) -> Self {
        Self { up: Some(up), down }
    }

    /// 指定メソッドの操作を取得
    pub fn operation(&self, method: Method) -> Option<&Operation> {
        match method {
            Method::Up => self.up.as_ref(),
            Method::Down => self.down.as_ref(),
        }
    }

    /// 本体の形状を検証
    ///
    /// # Returns
    ///
    /// 不正な場合はその理由
    pub fn validate(&self) -> Result<(), String> {
        let up = self
            .up
            .as_ref()
            .ok_or_else(|| "no up operation defined".to_string())?;

        if let Some(down) = &self.down {
            if up.is_single() != down.is_single() {
                return Err("up and down must both be a single step or both a list".to_string());
            }
            if !up.same_shape(down) {
                return Err(format!(
                    "up and down lists must have the same length ({} != {})",
                    up.steps().len(),
                    down.steps().len()
                ));
            }
        }

        Ok(())
    }
}

/// マイグレーションアーティファクト
///
/// ディスカバリー時に一度だけ構築され、以後変更されません。
#[derive(Debug, Clone)]
pub struct MigrationArtifact {
    /// 所有モジュール
    pub module: ModuleRef,
    /// カテゴリ
    pub category: Category,
    /// (module, category) 内で一意な名前
    pub relative_name: String,
    /// 名前から解析したバージョン
    pub version: Version,
    /// ログ・診断用の絶対パス
    pub path: PathBuf,
    /// 本体
    pub body: MigrationBody,
}

impl MigrationArtifact {
    /// 新しいアーティファクトを作成
    ///
    /// 名前がバージョン形式に一致しない場合はエラー
    pub fn new(
        module: ModuleRef,
        category: Category,
        relative_name: impl Into<String>,
        path: impl Into<PathBuf>,
        body: MigrationBody,
    ) -> Result<Self, VersionError> {
        let relative_name = relative_name.into();
        let version = Version::parse(&relative_name)?;

        Ok(Self {
            module,
            category,
            relative_name,
            version,
            path: path.into(),
            body,
        })
    }

    /// 表示用のパス
    pub fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    /// 指定した識別子と一致するかどうか
    pub fn is_identified_by(&self, module: &ModuleRef, name: &str, category: Category) -> bool {
        &self.module == module && self.relative_name == name && self.category == category
    }
}

/// 適用済み記録
///
/// up成功時に作成され、down成功時に削除されます。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedRecord {
    /// モジュール
    pub module: ModuleRef,
    /// カテゴリ
    pub category: Category,
    /// マイグレーション名
    pub name: String,
    /// 実行時間（ミリ秒）
    #[serde(default)]
    pub duration_ms: f64,
}

impl AppliedRecord {
    /// 新しい適用済み記録を作成
    pub fn new(module: ModuleRef, category: Category, name: impl Into<String>, duration_ms: f64) -> Self {
        Self {
            module,
            category,
            name: name.into(),
            duration_ms,
        }
    }

    /// アーティファクトから記録を作成
    pub fn for_artifact(artifact: &MigrationArtifact, duration_ms: f64) -> Self {
        Self::new(
            artifact.module.clone(),
            artifact.category,
            artifact.relative_name.clone(),
            duration_ms,
        )
    }

    /// 指定した識別子と一致するかどうか
    pub fn is_identified_by(&self, module: &ModuleRef, name: &str, category: Category) -> bool {
        &self.module == module && self.name == name && self.category == category
    }
}

/// 実行計画のエントリ
///
/// 解決のたびに再計算され、呼び出しをまたいでキャッシュされません。
#[derive(Debug, Clone)]
pub struct ExecutionPlanEntry {
    pub artifact: Arc<MigrationArtifact>,
}

impl ExecutionPlanEntry {
    /// 新しいエントリを作成
    pub fn new(artifact: Arc<MigrationArtifact>) -> Self {
        Self { artifact }
    }

    /// カテゴリ
    pub fn category(&self) -> Category {
        self.artifact.category
    }

    /// パス
    pub fn path(&self) -> &Path {
        &self.artifact.path
    }
}

/// 実行結果
#[derive(Debug, Clone, Serialize)]
pub struct MigrationOutcome {
    pub module: ModuleRef,
    pub category: Category,
    pub name: String,
    pub path: String,
    pub duration_ms: f64,
    /// 状態の保存に失敗した場合の警告
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<PersistenceWarning>,
}

impl MigrationOutcome {
    /// アーティファクトの実行結果を作成
    pub fn new(
        artifact: &MigrationArtifact,
        duration_ms: f64,
        warning: Option<PersistenceWarning>,
    ) -> Self {
        Self {
            module: artifact.module.clone(),
            category: artifact.category,
            name: artifact.relative_name.clone(),
            path: artifact.display_path(),
            duration_ms,
            warning,
        }
    }
}

/// 件数パラメータ文字列を解析
///
/// 正の整数のみを受け付けます。上限の検証は実行時に行います。
pub fn parse_count(raw: &str) -> Result<usize, MigrateError> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(MigrateError::InvalidCount {
            requested: raw.to_string(),
            reason: "must be a positive integer".to_string(),
        }),
        Ok(count) => Ok(count),
        Err(_) => Err(MigrateError::InvalidCount {
            requested: raw.to_string(),
            reason: "not an integer".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct NoopStep;

    #[async_trait]
    impl MigrationStep for NoopStep {
        async fn run(&self, _env: &Environment, _args: &[CallArgument]) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn single() -> Operation {
        Operation::Single(Arc::new(NoopStep))
    }

    fn sequence(len: usize) -> Operation {
        Operation::Sequence(
            (0..len)
                .map(|_| Arc::new(NoopStep) as Arc<dyn MigrationStep>)
                .collect(),
        )
    }

    #[test]
    fn test_method_opposite() {
        assert_eq!(Method::Up.opposite(), Method::Down);
        assert_eq!(Method::Down.opposite(), Method::Up);
        assert_eq!(Method::Up.to_string(), "up");
    }

    #[test]
    fn test_category_order_and_display() {
        assert_eq!(Category::ORDERED, [Category::Schema, Category::Data]);
        assert_eq!(Category::Data.to_string(), "data");
    }

    #[test]
    fn test_body_requires_up() {
        let body = MigrationBody {
            up: None,
            down: Some(single()),
        };
        assert!(body.validate().unwrap_err().contains("no up"));
    }

    #[test]
    fn test_body_accepts_missing_down() {
        assert!(MigrationBody::new(sequence(3), None).validate().is_ok());
    }

    #[test]
    fn test_body_rejects_mixed_shapes() {
        let body = MigrationBody::new(single(), Some(sequence(1)));
        assert!(body.validate().is_err());
    }

    #[test]
    fn test_body_rejects_length_mismatch() {
        let body = MigrationBody::new(sequence(2), Some(sequence(3)));
        let reason = body.validate().unwrap_err();
        assert!(reason.contains("same length"));
    }

    #[test]
    fn test_operation_steps() {
        assert_eq!(single().steps().len(), 1);
        assert_eq!(sequence(4).steps().len(), 4);
    }

    #[test]
    fn test_artifact_requires_version_name() {
        let module = ModuleRef::new("core");
        let body = MigrationBody::new(single(), None);

        let artifact = MigrationArtifact::new(
            module.clone(),
            Category::Schema,
            "0.1.0-init.yaml",
            "/app/core/migrations/schemas/0.1.0-init.yaml",
            body.clone(),
        )
        .unwrap();
        assert_eq!(artifact.version, Version::new(0, 1, 0));
        assert!(artifact.is_identified_by(&module, "0.1.0-init.yaml", Category::Schema));
        assert!(!artifact.is_identified_by(&module, "0.1.0-init.yaml", Category::Data));

        assert!(MigrationArtifact::new(module, Category::Schema, "init.yaml", "/x", body).is_err());
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("3").unwrap(), 3);
        assert!(parse_count("0").unwrap_err().is_invalid_count());
        assert!(parse_count("-1").unwrap_err().is_invalid_count());
        assert!(parse_count("1.5").unwrap_err().is_invalid_count());
        assert!(parse_count("abc").unwrap_err().is_invalid_count());
    }

    #[test]
    fn test_applied_record_serialization() {
        let record = AppliedRecord::new(ModuleRef::new("core"), Category::Data, "0.1.0-seed.yaml", 1.5);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"module\":\"core\""));
        assert!(json.contains("\"category\":\"data\""));

        let parsed: AppliedRecord =
            serde_json::from_str(r#"{"module":"core","category":"schema","name":"0.1.0-a.yaml"}"#)
                .unwrap();
        assert_eq!(parsed.duration_ms, 0.0);
    }
}
