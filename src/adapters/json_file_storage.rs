// JSONファイルストレージ
//
// 適用済み記録をJSON配列としてファイルに保存するストレージアダプター。
// 配列の順序がそのまま適用順になります。

use crate::adapters::storage::StorageAdapter;
use crate::core::error::StorageError;
use crate::core::migration::{AppliedRecord, Category, ModuleRef};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// JSONファイルストレージ
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    /// 新しいJsonFileStorageを作成
    ///
    /// ファイルは最初の記録時に作成されます。
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 保存先ファイルのパス
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 書き込み途中の内容を置く一時ファイル
    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn read_records(&self) -> Result<Vec<AppliedRecord>, StorageError> {
        if !self.is_initialized().await? {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| io_error(&self.path, e))?;

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| StorageError::Serialization {
            message: format!("{}: {}", self.path.display(), e),
        })
    }

    async fn write_records(&self, records: &[AppliedRecord]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| io_error(parent, e))?;
            }
        }

        let content =
            serde_json::to_string_pretty(records).map_err(|e| StorageError::Serialization {
                message: e.to_string(),
            })?;

        // 一時ファイルに書き出してから置き換える
        let staging = self.staging_path();
        fs::write(&staging, content)
            .await
            .map_err(|e| io_error(&staging, e))?;
        fs::rename(&staging, &self.path)
            .await
            .map_err(|e| io_error(&self.path, e))
    }
}

fn io_error(path: &Path, e: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        cause: e.to_string(),
    }
}

#[async_trait]
impl StorageAdapter for JsonFileStorage {
    async fn is_initialized(&self) -> Result<bool, StorageError> {
        fs::try_exists(&self.path)
            .await
            .map_err(|e| io_error(&self.path, e))
    }

    async fn list_applied(&self) -> Result<Vec<AppliedRecord>, StorageError> {
        self.read_records().await
    }

    async fn record_applied(&self, record: &AppliedRecord) -> Result<(), StorageError> {
        let mut records = self.read_records().await?;
        records.push(record.clone());
        debug!(path = %self.path.display(), name = %record.name, "Recording applied migration");
        self.write_records(&records).await
    }

    async fn remove_applied(
        &self,
        module: &ModuleRef,
        name: &str,
        category: Category,
    ) -> Result<(), StorageError> {
        let mut records = self.read_records().await?;

        // 最初に一致した1件のみ削除
        if let Some(index) = records
            .iter()
            .position(|record| record.is_identified_by(module, name, category))
        {
            records.remove(index);
        }

        debug!(path = %self.path.display(), name = %name, "Removing applied migration");
        self.write_records(&records).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(name: &str, category: Category) -> AppliedRecord {
        AppliedRecord::new(ModuleRef::new("core"), category, name, 1.0)
    }

    #[tokio::test]
    async fn test_uninitialized_storage() {
        let temp_dir = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(temp_dir.path().join("state/migrations.json"));

        assert!(!storage.is_initialized().await.unwrap());
        assert!(storage.list_applied().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_creates_file_and_keeps_order() {
        let temp_dir = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(temp_dir.path().join("state/migrations.json"));

        storage
            .record_applied(&record("0.1.1-b.yaml", Category::Schema))
            .await
            .unwrap();
        storage
            .record_applied(&record("0.1.0-a.yaml", Category::Data))
            .await
            .unwrap();

        assert!(storage.is_initialized().await.unwrap());
        let names: Vec<_> = storage
            .list_applied()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["0.1.1-b.yaml", "0.1.0-a.yaml"]);
    }

    #[tokio::test]
    async fn test_remove_matches_category() {
        let temp_dir = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(temp_dir.path().join("migrations.json"));
        let module = ModuleRef::new("core");

        storage
            .record_applied(&record("0.1.0-a.yaml", Category::Schema))
            .await
            .unwrap();
        storage
            .record_applied(&record("0.1.0-a.yaml", Category::Data))
            .await
            .unwrap();

        storage
            .remove_applied(&module, "0.1.0-a.yaml", Category::Data)
            .await
            .unwrap();

        let remaining = storage.list_applied().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].category, Category::Schema);
    }

    #[tokio::test]
    async fn test_corrupted_file_is_serialization_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("migrations.json");
        std::fs::write(&path, "{not json").unwrap();

        let storage = JsonFileStorage::new(path);
        let err = storage.list_applied().await.unwrap_err();
        assert!(err.is_serialization());
    }

    #[tokio::test]
    async fn test_write_replaces_file_without_leftovers() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("migrations.json");
        let storage = JsonFileStorage::new(&path);

        // 中断された書き込みの残骸は読み込みに影響しない
        std::fs::write(storage.staging_path(), "{partial").unwrap();

        storage
            .record_applied(&record("0.1.0-a.yaml", Category::Schema))
            .await
            .unwrap();
        storage
            .remove_applied(&ModuleRef::new("core"), "0.1.0-a.yaml", Category::Schema)
            .await
            .unwrap();

        let files: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(files, vec![std::ffi::OsString::from("migrations.json")]);
        assert!(storage.list_applied().await.unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_location_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        // 親がファイルのパスは「未作成」ではなくI/Oエラーとして扱う
        let storage = JsonFileStorage::new(blocker.join("migrations.json"));
        assert!(storage.list_applied().await.unwrap_err().is_io());
        assert!(storage
            .record_applied(&record("0.1.0-a.yaml", Category::Schema))
            .await
            .unwrap_err()
            .is_io());
        assert_eq!(std::fs::read_to_string(&blocker).unwrap(), "file");
    }
}
