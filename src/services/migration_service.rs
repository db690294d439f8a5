// マイグレーションサービス
//
// ディスカバリー、リゾルバー、実行エンジンを束ね、up / down / status を提供します。
// ストレージアダプターはキーごとのファクトリから遅延生成し、サービスの寿命の間キャッシュします。

use crate::adapters::storage::{factory_for, StorageAdapter, StorageFactory};
use crate::core::config::{Config, MigrateSettings};
use crate::core::error::{MigrateError, RunFailure};
use crate::core::migration::{
    AppliedRecord, Environment, ExecutionPlanEntry, Method, MigrationOutcome,
};
use crate::services::catalog::MigrationCatalog;
use crate::services::discovery::{FileSystemDiscovery, MigrationDiscovery};
use crate::services::events::{EventBus, MigrationObserver};
use crate::services::migration_executor::MigrationExecutor;
use crate::services::module_order::{ModuleGraph, ModuleOrder};
use crate::services::pending_resolver::PendingResolver;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// マイグレーションサービス
pub struct MigrationService {
    environment: Environment,
    settings: MigrateSettings,
    discovery: Arc<dyn MigrationDiscovery>,
    modules: Arc<dyn ModuleOrder>,
    storages: HashMap<String, StorageFactory>,
    instances: Mutex<HashMap<String, Arc<dyn StorageAdapter>>>,
    events: EventBus,
}

impl MigrationService {
    /// 新しいサービスを作成
    pub fn new(
        environment: Environment,
        settings: MigrateSettings,
        discovery: Arc<dyn MigrationDiscovery>,
        modules: Arc<dyn ModuleOrder>,
    ) -> Self {
        Self {
            environment,
            settings,
            discovery,
            modules,
            storages: HashMap::new(),
            instances: Mutex::new(HashMap::new()),
            events: EventBus::new(),
        }
    }

    /// 設定ファイルの内容からサービスを作成
    ///
    /// モジュールの依存順序を計算し、設定済みストレージをすべて登録します。
    pub fn from_config(environment: Environment, config: &Config) -> Result<Self, MigrateError> {
        let graph = ModuleGraph::from_config(&config.modules)?;
        let discovery = FileSystemDiscovery::from_graph(&environment.project_path, &graph);

        let mut service = Self::new(
            environment,
            config.migrate.clone(),
            Arc::new(discovery),
            Arc::new(graph),
        );
        for (key, storage) in &config.storages {
            service.add_storage(key.clone(), factory_for(storage.clone()));
        }

        Ok(service)
    }

    /// ストレージファクトリを登録
    pub fn add_storage(&mut self, key: impl Into<String>, factory: StorageFactory) {
        self.storages.insert(key.into(), factory);
    }

    /// イベントハンドラーを登録
    pub fn on(&mut self, event: impl Into<String>, observer: Arc<dyn MigrationObserver>) {
        self.events.on(event, observer);
    }

    /// イベントバス
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    /// ストレージアダプターを解決
    ///
    /// キー未指定時は設定のデフォルトキーを使用します。
    pub fn storage(&self, key: Option<&str>) -> Result<Arc<dyn StorageAdapter>, MigrateError> {
        let key = key
            .map(str::to_string)
            .or_else(|| self.settings.storage.clone())
            .ok_or(MigrateError::NoDefaultStorage)?;

        let mut instances = self
            .instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(adapter) = instances.get(&key) {
            return Ok(adapter.clone());
        }

        let factory = self
            .storages
            .get(&key)
            .ok_or_else(|| MigrateError::UnknownStorage { key: key.clone() })?;
        debug!(storage = %key, "Creating storage adapter");
        let adapter = factory(&self.environment)?;
        instances.insert(key, adapter.clone());

        Ok(adapter)
    }

    /// 未適用マイグレーションの実行計画
    pub async fn pending(&self, key: Option<&str>) -> Result<Vec<ExecutionPlanEntry>, MigrateError> {
        let storage = self.storage(key)?;
        self.resolve_plan(storage.as_ref()).await
    }

    /// 未適用マイグレーションの一覧（副作用なし）
    pub async fn status(&self, key: Option<&str>) -> Result<Vec<ExecutionPlanEntry>, MigrateError> {
        self.pending(key).await
    }

    /// 未適用マイグレーションを適用
    ///
    /// 失敗時は、それまでに完了した結果を`RunFailure`に保持して返します。
    pub async fn up(
        &self,
        count: Option<usize>,
        key: Option<&str>,
    ) -> Result<Vec<MigrationOutcome>, RunFailure> {
        let storage = self.storage(key)?;
        info!(count = ?count, storage = ?key, "Running migrations up");

        let plan = self.resolve_plan(storage.as_ref()).await?;
        if plan.is_empty() {
            warn!("No pending migration");
            return Ok(Vec::new());
        }

        let n = MigrationExecutor::resolve_count(count, plan.len())?;
        let executor = self.executor(storage.as_ref());

        let mut completed = Vec::with_capacity(n);
        for entry in plan.iter().take(n) {
            match executor.execute(&entry.artifact, Method::Up).await {
                Ok(outcome) => completed.push(outcome),
                Err(error) => return Err(RunFailure::new(completed, error)),
            }
        }

        Ok(completed)
    }

    /// 適用済みマイグレーションを新しい順に取り消し
    pub async fn down(
        &self,
        count: Option<usize>,
        key: Option<&str>,
    ) -> Result<Vec<MigrationOutcome>, RunFailure> {
        let storage = self.storage(key)?;
        info!(count = ?count, storage = ?key, "Running migrations down");

        let mut applied = self.applied(storage.as_ref()).await?;
        applied.reverse();
        if applied.is_empty() {
            warn!("No applied migration");
            return Ok(Vec::new());
        }

        let n = MigrationExecutor::resolve_count(count, applied.len())?;
        let catalog = MigrationCatalog::build(self.discovery.as_ref()).await?;
        let executor = self.executor(storage.as_ref());

        let mut completed = Vec::with_capacity(n);
        for record in applied.iter().take(n) {
            let Some(artifact) = catalog.find(&record.module, &record.name, record.category) else {
                let error = MigrateError::MissingArtifact {
                    module: record.module.to_string(),
                    category: record.category,
                    name: record.name.clone(),
                };
                return Err(RunFailure::new(completed, error));
            };

            match executor.execute(&artifact, Method::Down).await {
                Ok(outcome) => completed.push(outcome),
                Err(error) => return Err(RunFailure::new(completed, error)),
            }
        }

        Ok(completed)
    }

    fn executor<'a>(&'a self, storage: &'a dyn StorageAdapter) -> MigrationExecutor<'a> {
        MigrationExecutor::new(
            &self.environment,
            storage,
            &self.events,
            self.settings.roll_back,
        )
    }

    async fn applied(&self, storage: &dyn StorageAdapter) -> Result<Vec<AppliedRecord>, MigrateError> {
        if !storage.is_initialized().await? {
            return Ok(Vec::new());
        }
        Ok(storage.list_applied().await?)
    }

    async fn resolve_plan(
        &self,
        storage: &dyn StorageAdapter,
    ) -> Result<Vec<ExecutionPlanEntry>, MigrateError> {
        let catalog = MigrationCatalog::build(self.discovery.as_ref()).await?;
        let applied = self.applied(storage).await?;
        let order = self.modules.ordered_modules();

        Ok(PendingResolver::resolve(&order, &catalog, &applied))
    }
}
