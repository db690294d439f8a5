// モジュール依存順序
//
// マイグレーションを提供するモジュールの全順序を提供します。
// リゾルバーは順序を推論せず、このトレイトから受け取った順序をそのまま使用します。

use crate::core::config::ModuleConfig;
use crate::core::error::ConfigError;
use crate::core::migration::ModuleRef;
use std::collections::HashSet;
use std::path::PathBuf;

/// モジュール依存順序の提供者
pub trait ModuleOrder: Send + Sync {
    /// 依存先が先に並ぶモジュールの全順序
    fn ordered_modules(&self) -> Vec<ModuleRef>;
}

impl ModuleOrder for Vec<ModuleRef> {
    fn ordered_modules(&self) -> Vec<ModuleRef> {
        self.clone()
    }
}

/// 設定から構築したモジュールグラフ
///
/// 宣言順を保ったまま、依存先が先に来るよう並べ替えた結果を保持します。
#[derive(Debug, Clone)]
pub struct ModuleGraph {
    modules: Vec<(ModuleRef, PathBuf)>,
}

impl ModuleGraph {
    /// モジュール定義から依存順序を計算
    ///
    /// # Returns
    ///
    /// 重複、未知の依存先、循環がある場合は`ConfigError`
    pub fn from_config(configs: &[ModuleConfig]) -> Result<Self, ConfigError> {
        let mut declared = HashSet::new();
        for config in configs {
            if !declared.insert(config.name.as_str()) {
                return Err(ConfigError::DuplicateModule {
                    module: config.name.clone(),
                });
            }
        }

        for config in configs {
            if let Some(dependency) = config
                .depends_on
                .iter()
                .find(|dep| !declared.contains(dep.as_str()))
            {
                return Err(ConfigError::UnknownDependency {
                    module: config.name.clone(),
                    dependency: dependency.clone(),
                });
            }
        }

        let mut placed: HashSet<&str> = HashSet::new();
        let mut remaining: Vec<&ModuleConfig> = configs.iter().collect();
        let mut modules = Vec::with_capacity(configs.len());

        while !remaining.is_empty() {
            // 依存先がすべて配置済みの最初のモジュールを選ぶ
            let next = remaining.iter().position(|config| {
                config
                    .depends_on
                    .iter()
                    .all(|dep| placed.contains(dep.as_str()))
            });

            let Some(index) = next else {
                return Err(ConfigError::DependencyCycle {
                    modules: remaining.iter().map(|c| c.name.clone()).collect(),
                });
            };

            let config = remaining.remove(index);
            placed.insert(config.name.as_str());
            modules.push((ModuleRef::new(config.name.clone()), config.path.clone()));
        }

        Ok(Self { modules })
    }

    /// 依存順のモジュールとそのディレクトリ
    pub fn modules(&self) -> &[(ModuleRef, PathBuf)] {
        &self.modules
    }
}

impl ModuleOrder for ModuleGraph {
    fn ordered_modules(&self) -> Vec<ModuleRef> {
        self.modules.iter().map(|(module, _)| module.clone()).collect()
    }
}
