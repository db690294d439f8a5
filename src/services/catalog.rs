// マイグレーションカタログ
//
// ディスカバリー結果をカテゴリごとに保持し、識別子による検索を提供します。

use crate::core::error::MigrateError;
use crate::core::migration::{Category, MigrationArtifact, ModuleRef};
use crate::services::discovery::MigrationDiscovery;
use std::sync::Arc;

/// マイグレーションカタログ
#[derive(Debug, Clone, Default)]
pub struct MigrationCatalog {
    schema: Vec<Arc<MigrationArtifact>>,
    data: Vec<Arc<MigrationArtifact>>,
}

impl MigrationCatalog {
    /// アーティファクトからカタログを作成
    pub fn new(artifacts: Vec<MigrationArtifact>) -> Self {
        let mut catalog = Self::default();
        for artifact in artifacts {
            match artifact.category {
                Category::Schema => catalog.schema.push(Arc::new(artifact)),
                Category::Data => catalog.data.push(Arc::new(artifact)),
            }
        }
        catalog
    }

    /// ディスカバリーから両カテゴリを収集してカタログを作成
    pub async fn build(discovery: &dyn MigrationDiscovery) -> Result<Self, MigrateError> {
        let mut artifacts = Vec::new();
        for category in Category::ORDERED {
            artifacts.extend(discovery.discover(category).await?);
        }
        Ok(Self::new(artifacts))
    }

    /// カテゴリのアーティファクト
    pub fn artifacts(&self, category: Category) -> &[Arc<MigrationArtifact>] {
        match category {
            Category::Schema => &self.schema,
            Category::Data => &self.data,
        }
    }

    /// 識別子でアーティファクトを検索
    pub fn find(
        &self,
        module: &ModuleRef,
        name: &str,
        category: Category,
    ) -> Option<Arc<MigrationArtifact>> {
        self.artifacts(category)
            .iter()
            .find(|artifact| artifact.is_identified_by(module, name, category))
            .cloned()
    }
}
