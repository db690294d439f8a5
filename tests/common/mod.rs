// マイグレーションテスト共通ヘルパー

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use stratum_migrate::adapters::json_file_storage::JsonFileStorage;
use stratum_migrate::adapters::storage::{StorageAdapter, StorageFactory};
use stratum_migrate::core::config::MigrateSettings;
use stratum_migrate::core::error::{MigrateError, StorageError};
use stratum_migrate::core::migration::{
    AppliedRecord, CallArgument, Category, Environment, MigrationArtifact, MigrationBody,
    MigrationStep, ModuleRef, Operation,
};
use stratum_migrate::services::discovery::MigrationDiscovery;
use stratum_migrate::services::migration_service::MigrationService;
use tempfile::TempDir;

/// ステップの実行順を記録する共有ログ
pub type ExecutionLog = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> ExecutionLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &ExecutionLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// 実行時にラベルをログへ書き込むステップ
#[derive(Debug)]
pub struct RecordingStep {
    label: String,
    log: ExecutionLog,
}

impl RecordingStep {
    pub fn new(label: impl Into<String>, log: &ExecutionLog) -> Arc<dyn MigrationStep> {
        Arc::new(Self {
            label: label.into(),
            log: log.clone(),
        })
    }
}

#[async_trait]
impl MigrationStep for RecordingStep {
    async fn run(&self, _env: &Environment, _args: &[CallArgument]) -> Result<()> {
        self.log.lock().unwrap().push(self.label.clone());
        Ok(())
    }
}

/// ラベルを記録した後に失敗するステップ
#[derive(Debug)]
pub struct FailingStep {
    label: String,
    log: ExecutionLog,
}

impl FailingStep {
    pub fn new(label: impl Into<String>, log: &ExecutionLog) -> Arc<dyn MigrationStep> {
        Arc::new(Self {
            label: label.into(),
            log: log.clone(),
        })
    }
}

#[async_trait]
impl MigrationStep for FailingStep {
    async fn run(&self, _env: &Environment, _args: &[CallArgument]) -> Result<()> {
        self.log.lock().unwrap().push(self.label.clone());
        bail!("{} failed", self.label)
    }
}

/// 記録付きのup / downを持つアーティファクト
pub fn recorded(module: &str, category: Category, name: &str, log: &ExecutionLog) -> MigrationArtifact {
    let id = format!("{}/{}/{}", module, category, name);
    artifact(
        module,
        category,
        name,
        MigrationBody::new(
            Operation::Single(RecordingStep::new(format!("up:{}", id), log)),
            Some(Operation::Single(RecordingStep::new(format!("down:{}", id), log))),
        ),
    )
}

pub fn artifact(module: &str, category: Category, name: &str, body: MigrationBody) -> MigrationArtifact {
    MigrationArtifact::new(
        ModuleRef::new(module),
        category,
        name,
        artifact_path(module, category, name),
        body,
    )
    .unwrap()
}

pub fn artifact_path(module: &str, category: Category, name: &str) -> PathBuf {
    let dir = match category {
        Category::Schema => "schemas",
        Category::Data => "data",
    };
    PathBuf::from(format!("/project/{}/migrations/{}/{}", module, dir, name))
}

/// 差し替え可能なメモリ上のディスカバリー
#[derive(Default)]
pub struct StaticDiscovery {
    artifacts: Mutex<Vec<MigrationArtifact>>,
}

impl StaticDiscovery {
    pub fn new(artifacts: Vec<MigrationArtifact>) -> Arc<Self> {
        Arc::new(Self {
            artifacts: Mutex::new(artifacts),
        })
    }

    /// アーティファクトを取り除く（コードの削除を模擬）
    pub fn remove(&self, module: &str, name: &str, category: Category) {
        self.artifacts
            .lock()
            .unwrap()
            .retain(|a| !a.is_identified_by(&ModuleRef::new(module), name, category));
    }
}

#[async_trait]
impl MigrationDiscovery for StaticDiscovery {
    async fn discover(&self, category: Category) -> Result<Vec<MigrationArtifact>, MigrateError> {
        Ok(self
            .artifacts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.category == category)
            .cloned()
            .collect())
    }
}

/// 記録・削除に失敗するストレージ
pub struct BrokenWriteStorage {
    inner: JsonFileStorage,
}

impl BrokenWriteStorage {
    pub fn new(inner: JsonFileStorage) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl StorageAdapter for BrokenWriteStorage {
    async fn is_initialized(&self) -> Result<bool, StorageError> {
        self.inner.is_initialized().await
    }

    async fn list_applied(&self) -> Result<Vec<AppliedRecord>, StorageError> {
        self.inner.list_applied().await
    }

    async fn record_applied(&self, _record: &AppliedRecord) -> Result<(), StorageError> {
        Err(StorageError::Io {
            path: "state.json".to_string(),
            cause: "read-only file system".to_string(),
        })
    }

    async fn remove_applied(
        &self,
        _module: &ModuleRef,
        _name: &str,
        _category: Category,
    ) -> Result<(), StorageError> {
        Err(StorageError::Io {
            path: "state.json".to_string(),
            cause: "read-only file system".to_string(),
        })
    }
}

pub fn json_factory(path: PathBuf) -> StorageFactory {
    Arc::new(
        move |_env: &Environment| -> Result<Arc<dyn StorageAdapter>, StorageError> {
            Ok(Arc::new(JsonFileStorage::new(path.clone())))
        },
    )
}

/// モジュール順 [A, B, C] とJSONストレージ"local"を持つサービス
pub fn service(
    temp_dir: &TempDir,
    discovery: Arc<dyn MigrationDiscovery>,
    roll_back: bool,
) -> MigrationService {
    let settings = MigrateSettings {
        storage: Some("local".to_string()),
        roll_back,
    };
    let modules = vec![ModuleRef::new("A"), ModuleRef::new("B"), ModuleRef::new("C")];

    let mut service = MigrationService::new(
        Environment::new("test", temp_dir.path()),
        settings,
        discovery,
        Arc::new(modules),
    );
    service.add_storage("local", json_factory(temp_dir.path().join("state.json")));
    service
}

/// 適用済み記録を (module/category/name) 形式で取得
pub async fn applied_ids(service: &MigrationService) -> Vec<String> {
    let storage = service.storage(None).unwrap();
    storage
        .list_applied()
        .await
        .unwrap()
        .iter()
        .map(|r| format!("{}/{}/{}", r.module, r.category, r.name))
        .collect()
}
