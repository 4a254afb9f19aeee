use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::Value;

use super::types::{CaptureError, CaptureId, CaptureRecord};
use crate::settings::{DEFAULT_MAX_SCREENSHOTS, MAX_SCREENSHOTS_CAP};
use crate::storage::{KeyValueStore, StorageError, StorageScope};

/// Storage key holding the persisted capture list.
pub const SCREENSHOTS_KEY: &str = "screenshots";

/// Ordered list of captures mirrored to local storage.
///
/// Insertion order is capture order and export order. All mutation goes
/// through this type; every mutation persists the full list.
pub struct CaptureStore {
    records: Vec<CaptureRecord>,
    storage: Arc<dyn KeyValueStore>,
    max_records: u32,
}

impl CaptureStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            records: Vec::new(),
            storage,
            max_records: DEFAULT_MAX_SCREENSHOTS,
        }
    }

    pub fn with_limit(storage: Arc<dyn KeyValueStore>, max_records: u32) -> Self {
        let mut store = Self::new(storage);
        store.set_limit(max_records);
        store
    }

    pub fn limit(&self) -> u32 {
        self.max_records
    }

    /// Change the capacity. Existing records beyond the new limit are kept.
    pub fn set_limit(&mut self, max_records: u32) {
        self.max_records = max_records.clamp(1, MAX_SCREENSHOTS_CAP);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CaptureRecord] {
        &self.records
    }

    pub fn get(&self, id: CaptureId) -> Option<&CaptureRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    /// Copy of the current list, detached from later mutation.
    pub fn snapshot(&self) -> Vec<CaptureRecord> {
        self.records.clone()
    }

    /// Replace the in-memory list with the persisted one.
    pub async fn load(&mut self) -> Result<usize, CaptureError> {
        let stored = self
            .storage
            .get(StorageScope::Local, SCREENSHOTS_KEY)
            .await?;

        self.records = match stored {
            Some(Value::Null) | None => Vec::new(),
            Some(value) => serde_json::from_value(value).map_err(StorageError::from)?,
        };

        if self.records.len() > self.max_records as usize {
            warn!(
                "Loaded {} captures which exceeds the limit of {}; new captures will be refused",
                self.records.len(),
                self.max_records
            );
        }

        info!("Loaded {} existing screenshots", self.records.len());
        Ok(self.records.len())
    }

    /// Append a capture and persist. Fails when the store is full.
    pub async fn append(&mut self, record: CaptureRecord) -> Result<CaptureId, CaptureError> {
        if self.records.len() >= self.max_records as usize {
            return Err(CaptureError::CaptureLimitReached(self.max_records));
        }

        let id = record.id;
        let mut records = self.records.clone();
        records.push(record);
        self.commit(records).await?;
        debug!("Appended capture {} ({} total)", id, self.records.len());
        Ok(id)
    }

    /// Set the caption of the identified capture and persist.
    pub async fn set_caption(
        &mut self,
        id: CaptureId,
        caption: impl Into<String>,
    ) -> Result<(), CaptureError> {
        let mut records = self.records.clone();
        let record = records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(CaptureError::RecordNotFound(id))?;
        record.caption = caption.into();
        self.commit(records).await
    }

    /// Drop every capture and persist the empty list.
    pub async fn reset(&mut self) -> Result<(), CaptureError> {
        self.commit(Vec::new()).await
    }

    /// Replace the whole list and persist.
    pub async fn replace(&mut self, records: Vec<CaptureRecord>) -> Result<(), CaptureError> {
        self.commit(records).await
    }

    /// Persist `records` and adopt them only once storage accepted them.
    async fn commit(&mut self, records: Vec<CaptureRecord>) -> Result<(), CaptureError> {
        let value = serde_json::to_value(&records).map_err(StorageError::from)?;
        self.storage
            .set(StorageScope::Local, SCREENSHOTS_KEY, value)
            .await?;
        self.records = records;
        Ok(())
    }
}
