// マイグレーションディスカバリー
//
// モジュールのディレクトリからマイグレーションファイルを収集します。
// 名前がバージョン形式に一致しないファイルは読み飛ばします。

use crate::core::error::MigrateError;
use crate::core::migration::{Category, MigrationArtifact, ModuleRef};
use crate::core::naming::{DATA_MIGRATIONS_DIR, SCHEMA_MIGRATIONS_DIR};
use crate::core::version::MIGRATION_NAME_REGEX;
use crate::services::module_order::ModuleGraph;
use crate::services::steps::MigrationManifest;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// マイグレーションの提供者
#[async_trait]
pub trait MigrationDiscovery: Send + Sync {
    /// 指定カテゴリのアーティファクトをすべて取得
    async fn discover(&self, category: Category) -> Result<Vec<MigrationArtifact>, MigrateError>;
}

/// ファイルシステムからのディスカバリー
///
/// `<module>/migrations/schemas` と `<module>/migrations/data` 配下の
/// `MAJOR.MINOR.PATCH-label.yaml` を読み込みます。
#[derive(Debug, Clone)]
pub struct FileSystemDiscovery {
    modules: Vec<(ModuleRef, PathBuf)>,
}

impl FileSystemDiscovery {
    /// モジュールとそのディレクトリ（絶対パス）から作成
    pub fn new(modules: Vec<(ModuleRef, PathBuf)>) -> Self {
        Self { modules }
    }

    /// モジュールグラフから作成（パスはプロジェクトルート基準）
    pub fn from_graph(project_path: &Path, graph: &ModuleGraph) -> Self {
        Self::new(
            graph
                .modules()
                .iter()
                .map(|(module, path)| (module.clone(), project_path.join(path)))
                .collect(),
        )
    }

    fn category_dir(category: Category) -> &'static str {
        match category {
            Category::Schema => SCHEMA_MIGRATIONS_DIR,
            Category::Data => DATA_MIGRATIONS_DIR,
        }
    }

    async fn load_module(
        &self,
        module: &ModuleRef,
        dir: &Path,
        category: Category,
    ) -> Result<Vec<MigrationArtifact>, MigrateError> {
        let read_dir_error = |e: std::io::Error| MigrateError::Discovery {
            message: format!("Failed to read directory {}", dir.display()),
            cause: e.to_string(),
        };

        if !fs::try_exists(dir).await.map_err(read_dir_error)? {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(dir).await.map_err(read_dir_error)?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(read_dir_error)? {
            let path = entry.path();
            // シンボリックリンクは参照先で判定
            match fs::metadata(&path).await {
                Ok(metadata) if metadata.is_file() => {}
                Ok(_) => continue,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            if !is_migration_file(&name) {
                debug!(path = %path.display(), "Skipping non-migration file");
                continue;
            }
            files.push((name, path));
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));

        let mut artifacts = Vec::with_capacity(files.len());
        for (name, path) in files {
            let content = fs::read_to_string(&path)
                .await
                .map_err(|e| MigrateError::Discovery {
                    message: format!("Failed to read migration {}", path.display()),
                    cause: e.to_string(),
                })?;

            let manifest =
                MigrationManifest::parse(&content).map_err(|e| MigrateError::Discovery {
                    message: format!("Failed to parse migration {}", path.display()),
                    cause: format!("{:#}", e),
                })?;

            match MigrationArtifact::new(
                module.clone(),
                category,
                name,
                path.clone(),
                manifest.into_body(),
            ) {
                Ok(artifact) => artifacts.push(artifact),
                Err(e) => debug!(path = %path.display(), error = %e, "Skipping migration"),
            }
        }

        Ok(artifacts)
    }
}

#[async_trait]
impl MigrationDiscovery for FileSystemDiscovery {
    async fn discover(&self, category: Category) -> Result<Vec<MigrationArtifact>, MigrateError> {
        let mut artifacts = Vec::new();
        for (module, root) in &self.modules {
            let dir = root.join(Self::category_dir(category));
            let found = self.load_module(module, &dir, category).await?;
            debug!(module = %module, category = %category, count = found.len(), "Discovered migrations");
            artifacts.extend(found);
        }
        Ok(artifacts)
    }
}

/// マイグレーションファイル名かどうか（`.yaml` / `.yml`）
fn is_migration_file(name: &str) -> bool {
    let stem = name
        .strip_suffix(".yaml")
        .or_else(|| name.strip_suffix(".yml"));
    matches!(stem, Some(stem) if MIGRATION_NAME_REGEX.is_match(stem))
}
