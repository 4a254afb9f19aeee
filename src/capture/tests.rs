use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value, json};

use super::{
    annotation::{AnnotationFlow, CaptionResponse},
    frame::format_time,
    store::{CaptureStore, SCREENSHOTS_KEY},
    types::{CaptureError, CaptureId, CaptureRecord},
};
use crate::storage::{KeyValueStore, MemoryStore, StorageError, StorageScope};

pub(crate) fn solid_png(width: i32, height: i32) -> Vec<u8> {
    use cairo::{Context, Format, ImageSurface};

    let surface = ImageSurface::create(Format::ARgb32, width, height).unwrap();
    let ctx = Context::new(&surface).unwrap();
    ctx.set_source_rgb(1.0, 0.0, 0.0);
    ctx.paint().unwrap();
    drop(ctx);

    let mut buffer = Vec::new();
    surface.write_to_png(&mut buffer).unwrap();
    buffer
}

pub(crate) fn record_at(seconds: f64, caption: &str) -> CaptureRecord {
    CaptureRecord {
        id: CaptureId::new(),
        image: solid_png(16, 9),
        timestamp: seconds,
        time_formatted: format_time(seconds),
        caption: caption.to_string(),
        captured_at: Utc::now(),
    }
}

/// Memory store whose writes can be made to fail.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get_many(
        &self,
        scope: StorageScope,
        keys: &[&str],
    ) -> Result<Map<String, Value>, StorageError> {
        self.inner.get_many(scope, keys).await
    }

    async fn set_many(
        &self,
        scope: StorageScope,
        entries: Map<String, Value>,
    ) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Lock("quota exceeded".to_string()));
        }
        self.inner.set_many(scope, entries).await
    }

    async fn remove(&self, scope: StorageScope, key: &str) -> Result<(), StorageError> {
        self.inner.remove(scope, key).await
    }
}

fn memory_store() -> (Arc<MemoryStore>, CaptureStore) {
    let storage = Arc::new(MemoryStore::new());
    let store = CaptureStore::new(storage.clone());
    (storage, store)
}

#[tokio::test]
async fn appends_keep_request_order_and_persist() {
    let (storage, mut store) = memory_store();
    for i in 0..5 {
        store.append(record_at(i as f64 * 10.0, "")).await.unwrap();
    }

    assert_eq!(store.len(), 5);
    let stamps: Vec<_> = store.records().iter().map(|r| r.timestamp).collect();
    assert_eq!(stamps, vec![0.0, 10.0, 20.0, 30.0, 40.0]);

    let persisted = storage
        .get(StorageScope::Local, SCREENSHOTS_KEY)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(persisted.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn append_refuses_beyond_limit() {
    let storage = Arc::new(MemoryStore::new());
    let mut store = CaptureStore::with_limit(storage, 2);
    store.append(record_at(1.0, "")).await.unwrap();
    store.append(record_at(2.0, "")).await.unwrap();

    let err = store.append(record_at(3.0, "")).await.unwrap_err();
    assert!(matches!(err, CaptureError::CaptureLimitReached(2)));
    assert_eq!(store.len(), 2);
}

#[test]
fn limit_is_clamped_to_hard_cap() {
    let storage = Arc::new(MemoryStore::new());
    assert_eq!(CaptureStore::with_limit(storage.clone(), 500).limit(), 100);
    assert_eq!(CaptureStore::with_limit(storage, 0).limit(), 1);
}

#[tokio::test]
async fn reset_persists_empty_list() {
    let (storage, mut store) = memory_store();
    store.append(record_at(1.0, "a")).await.unwrap();
    store.reset().await.unwrap();

    assert!(store.is_empty());
    assert_eq!(
        storage
            .get(StorageScope::Local, SCREENSHOTS_KEY)
            .await
            .unwrap(),
        Some(json!([]))
    );
}

#[tokio::test]
async fn load_restores_persisted_records() {
    let (storage, mut store) = memory_store();
    store.append(record_at(5.0, "first")).await.unwrap();
    store.append(record_at(6.0, "second")).await.unwrap();
    let original = store.snapshot();

    let mut reloaded = CaptureStore::new(storage);
    assert_eq!(reloaded.load().await.unwrap(), 2);
    assert_eq!(reloaded.records(), original.as_slice());
}

#[tokio::test]
async fn load_assigns_ids_to_legacy_records() {
    let storage = Arc::new(MemoryStore::new());
    let image = crate::delivery::data_url::encode("image/png", &solid_png(4, 4));
    storage
        .set(
            StorageScope::Local,
            SCREENSHOTS_KEY,
            json!([{
                "image": image,
                "timestamp": 61.0,
                "timeFormatted": "00:01:01",
                "caption": "legacy",
                "dateCapture": "2024-03-01T10:00:00.000Z"
            }]),
        )
        .await
        .unwrap();

    let mut store = CaptureStore::new(storage);
    store.load().await.unwrap();
    assert_eq!(store.records()[0].caption, "legacy");
    assert_eq!(store.records()[0].time_formatted, "00:01:01");
}

#[tokio::test]
async fn snapshot_is_detached_from_later_captures() {
    let (_storage, mut store) = memory_store();
    store.append(record_at(1.0, "")).await.unwrap();
    let snapshot = store.snapshot();
    store.append(record_at(2.0, "")).await.unwrap();
    assert_eq!(snapshot.len(), 1);
}

#[tokio::test]
async fn annotation_targets_record_by_id() {
    let (_storage, mut store) = memory_store();
    let first = store.append(record_at(1.0, "")).await.unwrap();
    let pending = AnnotationFlow.begin(first);

    // Another capture lands while the caption entry is open.
    store.append(record_at(2.0, "")).await.unwrap();

    pending.confirm(&mut store, "intro slide").await.unwrap();
    assert_eq!(store.records()[0].caption, "intro slide");
    assert!(store.records()[1].caption.is_empty());
}

#[tokio::test]
async fn annotation_after_reset_reports_missing_record() {
    let (_storage, mut store) = memory_store();
    let id = store.append(record_at(1.0, "")).await.unwrap();
    let pending = AnnotationFlow.begin(id);

    store.reset().await.unwrap();
    store.append(record_at(9.0, "")).await.unwrap();

    let err = pending.confirm(&mut store, "late").await.unwrap_err();
    assert!(matches!(err, CaptureError::RecordNotFound(missing) if missing == id));
    assert!(store.records()[0].caption.is_empty());
}

#[tokio::test]
async fn submit_keeps_multiline_text_and_skip_leaves_caption_empty() {
    let (_storage, mut store) = memory_store();
    let a = store.append(record_at(1.0, "")).await.unwrap();
    let b = store.append(record_at(2.0, "")).await.unwrap();

    AnnotationFlow
        .begin(a)
        .resolve(&mut store, CaptionResponse::Submit("line one\nline two".into()))
        .await
        .unwrap();
    AnnotationFlow
        .begin(b)
        .resolve(&mut store, CaptionResponse::Skip)
        .await
        .unwrap();

    assert_eq!(store.get(a).unwrap().caption, "line one\nline two");
    assert_eq!(store.get(b).unwrap().caption, "");
}

#[tokio::test]
async fn replace_swaps_the_whole_list_and_persists() {
    let (storage, mut store) = memory_store();
    store.append(record_at(1.0, "old")).await.unwrap();

    let replacement = vec![record_at(7.0, "b"), record_at(3.0, "a")];
    store.replace(replacement.clone()).await.unwrap();
    assert_eq!(store.records(), replacement.as_slice());

    let mut reloaded = CaptureStore::new(storage);
    reloaded.load().await.unwrap();
    assert_eq!(reloaded.records(), replacement.as_slice());
}

#[tokio::test]
async fn failed_write_leaves_memory_matching_storage() {
    let storage = Arc::new(FlakyStore::default());
    let mut store = CaptureStore::new(storage.clone());
    let kept = store.append(record_at(1.0, "kept")).await.unwrap();

    storage.fail_writes.store(true, Ordering::SeqCst);
    let err = store.append(record_at(2.0, "")).await.unwrap_err();
    assert!(matches!(err, CaptureError::Storage(_)));
    assert!(store.set_caption(kept, "changed").await.is_err());
    assert!(store.reset().await.is_err());

    assert_eq!(store.len(), 1);
    assert_eq!(store.records()[0].caption, "kept");

    storage.fail_writes.store(false, Ordering::SeqCst);
    store.append(record_at(3.0, "")).await.unwrap();
    let mut reloaded = CaptureStore::new(storage);
    reloaded.load().await.unwrap();
    let stamps: Vec<_> = reloaded.records().iter().map(|r| r.timestamp).collect();
    assert_eq!(stamps, vec![1.0, 3.0]);
}
