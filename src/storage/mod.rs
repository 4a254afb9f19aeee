//! Key-value persistence for captures and settings.
//!
//! Two scopes mirror the host storage areas the captures and settings live in:
//! `Local` holds the capture list, `Sync` holds user settings. Each call is
//! atomic on its own; callers must not assume ordering between independently
//! issued calls.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// Storage area a key lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageScope {
    /// Per-machine data (the capture list).
    Local,
    /// User preferences.
    Sync,
}

impl StorageScope {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageScope::Local => "local",
            StorageScope::Sync => "sync",
        }
    }
}

/// Errors raised by a [`KeyValueStore`].
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage payload could not be (de)serialised: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage lock failed: {0}")]
    Lock(String),
}

/// Asynchronous key-value store keyed by string, holding JSON values.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the listed keys. Missing keys are absent from the returned map.
    async fn get_many(
        &self,
        scope: StorageScope,
        keys: &[&str],
    ) -> Result<Map<String, Value>, StorageError>;

    /// Write every entry in a single atomic call.
    async fn set_many(
        &self,
        scope: StorageScope,
        entries: Map<String, Value>,
    ) -> Result<(), StorageError>;

    async fn remove(&self, scope: StorageScope, key: &str) -> Result<(), StorageError>;

    async fn get(&self, scope: StorageScope, key: &str) -> Result<Option<Value>, StorageError> {
        let mut values = self.get_many(scope, &[key]).await?;
        Ok(values.remove(key))
    }

    async fn set(&self, scope: StorageScope, key: &str, value: Value) -> Result<(), StorageError> {
        let mut entries = Map::new();
        entries.insert(key.to_string(), value);
        self.set_many(scope, entries).await
    }
}
