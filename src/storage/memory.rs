use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use super::{KeyValueStore, StorageError, StorageScope};

/// In-process store. Contents live as long as the value does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    scopes: Mutex<HashMap<StorageScope, Map<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_many(
        &self,
        scope: StorageScope,
        keys: &[&str],
    ) -> Result<Map<String, Value>, StorageError> {
        let scopes = self.scopes.lock().await;
        let mut found = Map::new();
        if let Some(values) = scopes.get(&scope) {
            for key in keys {
                if let Some(value) = values.get(*key) {
                    found.insert((*key).to_string(), value.clone());
                }
            }
        }
        Ok(found)
    }

    async fn set_many(
        &self,
        scope: StorageScope,
        entries: Map<String, Value>,
    ) -> Result<(), StorageError> {
        let mut scopes = self.scopes.lock().await;
        scopes.entry(scope).or_default().extend(entries);
        Ok(())
    }

    async fn remove(&self, scope: StorageScope, key: &str) -> Result<(), StorageError> {
        if let Some(values) = self.scopes.lock().await.get_mut(&scope) {
            values.remove(key);
        }
        Ok(())
    }
}
