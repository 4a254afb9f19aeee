use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use log::{debug, warn};
use serde_json::{Map, Value};
use tokio::task;

use super::{KeyValueStore, StorageError, StorageScope};

/// File-backed store: one JSON document per scope inside `base_dir`.
///
/// Every call takes an exclusive lock on `<scope>.lock`, rewrites the document
/// into a temporary file and renames it over the previous one, so readers never
/// observe a half-written document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    base_dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn document_path(&self, scope: StorageScope) -> PathBuf {
        self.base_dir.join(format!("{}.json", scope.as_str()))
    }

    fn lock_path(&self, scope: StorageScope) -> PathBuf {
        self.base_dir.join(format!("{}.lock", scope.as_str()))
    }

    /// Run `op` on the scope's document while holding its lock.
    fn with_document<T>(
        &self,
        scope: StorageScope,
        op: impl FnOnce(&mut Map<String, Value>) -> Option<T>,
    ) -> Result<Option<T>, StorageError> {
        fs::create_dir_all(&self.base_dir)?;

        let lock_path = self.lock_path(scope);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        FileExt::lock_exclusive(&lock_file).map_err(|err| {
            StorageError::Lock(format!("{}: {}", lock_path.display(), err))
        })?;

        let result = self.modify_locked(scope, op);

        FileExt::unlock(&lock_file).unwrap_or_else(|err| {
            warn!("failed to unlock storage file {}: {}", lock_path.display(), err)
        });

        result
    }

    fn modify_locked<T>(
        &self,
        scope: StorageScope,
        op: impl FnOnce(&mut Map<String, Value>) -> Option<T>,
    ) -> Result<Option<T>, StorageError> {
        let path = self.document_path(scope);
        let mut document = read_document(&path)?;
        let before = document.clone();

        let output = op(&mut document);

        if document != before {
            write_document(&path, &document)?;
            debug!("Storage scope '{}' written to {}", scope.as_str(), path.display());
        }

        Ok(output)
    }

    async fn run_blocking<T: Send + 'static>(
        &self,
        scope: StorageScope,
        op: impl FnOnce(&mut Map<String, Value>) -> Option<T> + Send + 'static,
    ) -> Result<Option<T>, StorageError> {
        let store = self.clone();
        task::spawn_blocking(move || store.with_document(scope, op))
            .await
            .map_err(|err| StorageError::Lock(format!("storage task failed: {}", err)))?
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get_many(
        &self,
        scope: StorageScope,
        keys: &[&str],
    ) -> Result<Map<String, Value>, StorageError> {
        let keys: Vec<String> = keys.iter().map(|key| key.to_string()).collect();
        let found = self
            .run_blocking(scope, move |document| {
                let mut found = Map::new();
                for key in keys {
                    if let Some(value) = document.get(&key) {
                        found.insert(key, value.clone());
                    }
                }
                Some(found)
            })
            .await?;
        Ok(found.unwrap_or_default())
    }

    async fn set_many(
        &self,
        scope: StorageScope,
        entries: Map<String, Value>,
    ) -> Result<(), StorageError> {
        self.run_blocking(scope, move |document| {
            document.extend(entries);
            Some(())
        })
        .await?;
        Ok(())
    }

    async fn remove(&self, scope: StorageScope, key: &str) -> Result<(), StorageError> {
        let key = key.to_string();
        self.run_blocking(scope, move |document| document.remove(&key).map(|_| ()))
            .await?;
        Ok(())
    }
}

fn read_document(path: &Path) -> Result<Map<String, Value>, StorageError> {
    if !path.exists() {
        return Ok(Map::new());
    }

    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;
    if bytes.is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_slice::<Value>(&bytes)? {
        Value::Object(map) => Ok(map),
        other => {
            warn!(
                "Storage document {} is not an object ({}); starting fresh",
                path.display(),
                other
            );
            Ok(Map::new())
        }
    }
}

fn write_document(path: &Path, document: &Map<String, Value>) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec_pretty(document)?;
    let tmp_path = path.with_extension("json.tmp");
    {
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(&bytes)?;
        tmp_file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn values_survive_a_new_store_instance() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp.path());
        store
            .set(StorageScope::Local, "screenshots", json!(["a"]))
            .await
            .unwrap();

        let reopened = JsonFileStore::new(temp.path());
        assert_eq!(
            reopened
                .get(StorageScope::Local, "screenshots")
                .await
                .unwrap(),
            Some(json!(["a"]))
        );
        assert!(temp.path().join("local.json").exists());
        assert!(!temp.path().join("local.json.tmp").exists());
    }

    #[tokio::test]
    async fn set_many_merges_into_existing_document() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp.path());
        store
            .set(StorageScope::Sync, "darkMode", json!(false))
            .await
            .unwrap();

        let mut entries = Map::new();
        entries.insert("imageQuality".into(), json!("low"));
        entries.insert("darkMode".into(), json!(true));
        store.set_many(StorageScope::Sync, entries).await.unwrap();

        let values = store
            .get_many(StorageScope::Sync, &["darkMode", "imageQuality", "missing"])
            .await
            .unwrap();
        assert_eq!(values.get("darkMode"), Some(&json!(true)));
        assert_eq!(values.get("imageQuality"), Some(&json!("low")));
        assert!(!values.contains_key("missing"));
    }

    #[tokio::test]
    async fn missing_directory_reads_as_empty() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp.path().join("nested/store"));
        assert_eq!(store.get(StorageScope::Local, "x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_document_is_reported() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("local.json"), b"{ not json").unwrap();
        let store = JsonFileStore::new(temp.path());
        let err = store.get(StorageScope::Local, "x").await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
