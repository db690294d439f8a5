// 未適用マイグレーションの解決
//
// モジュール順序、カタログ、適用済み記録から実行計画を組み立てます。
// モジュール順 → カテゴリ順（スキーマが先）→ バージョン昇順 → 名前昇順。

use crate::core::migration::{AppliedRecord, Category, ExecutionPlanEntry, ModuleRef};
use crate::services::catalog::MigrationCatalog;
use std::collections::HashSet;

/// 未適用マイグレーションのリゾルバー
#[derive(Debug, Default, Clone, Copy)]
pub struct PendingResolver;

impl PendingResolver {
    /// 実行計画を解決
    ///
    /// 順序に含まれないモジュールのマイグレーションは計画に入りません。
    pub fn resolve(
        order: &[ModuleRef],
        catalog: &MigrationCatalog,
        applied: &[AppliedRecord],
    ) -> Vec<ExecutionPlanEntry> {
        let applied: HashSet<(&str, Category, &str)> = applied
            .iter()
            .map(|record| (record.module.as_str(), record.category, record.name.as_str()))
            .collect();

        let mut plan = Vec::new();
        for module in order {
            for category in Category::ORDERED {
                let mut pending: Vec<_> = catalog
                    .artifacts(category)
                    .iter()
                    .filter(|artifact| &artifact.module == module)
                    .filter(|artifact| {
                        !applied.contains(&(
                            artifact.module.as_str(),
                            category,
                            artifact.relative_name.as_str(),
                        ))
                    })
                    .cloned()
                    .collect();

                pending.sort_by(|a, b| {
                    a.version
                        .cmp(&b.version)
                        .then_with(|| a.relative_name.cmp(&b.relative_name))
                });

                plan.extend(pending.into_iter().map(ExecutionPlanEntry::new));
            }
        }

        plan
    }
}
