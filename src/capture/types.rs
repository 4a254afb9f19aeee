//! Data types for frame capture.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::storage::StorageError;

/// Stable identity of a capture, assigned when the frame is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptureId(Uuid);

impl CaptureId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CaptureId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CaptureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One captured still frame and its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRecord {
    /// Legacy records without an id get a fresh one on load.
    #[serde(default)]
    pub id: CaptureId,
    /// PNG bytes, persisted as a `data:image/png;base64,` URL.
    #[serde(with = "crate::delivery::data_url::png_serde")]
    pub image: Vec<u8>,
    /// Playback position in seconds.
    pub timestamp: f64,
    /// `timestamp` formatted as `HH:MM:SS`.
    pub time_formatted: String,
    #[serde(default)]
    pub caption: String,
    #[serde(rename = "dateCapture")]
    pub captured_at: DateTime<Utc>,
}

/// Errors raised while capturing or annotating frames.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("No video found on page!")]
    NoMediaElement,

    #[error("Error capturing screenshot: {0}")]
    CaptureFailed(String),

    #[error("Capture limit of {0} screenshots reached")]
    CaptureLimitReached(u32),

    #[error("Capture {0} no longer exists")]
    RecordNotFound(CaptureId),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
