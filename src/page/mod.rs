//! The page context: the user-facing side of tubesnap.
//!
//! A [`PageContext`] owns the capture store and drives capture, captioning,
//! viewing, reset and export. Files are never written from here; artifacts go
//! to the host context through a [`crate::delivery::HostHandle`].

pub mod context;
pub mod readiness;
pub mod reinit;


pub use context::{CaptureSummary, PageContext, PageOptions};
pub use readiness::{
    NavigationEvent, NavigationWatcher, Readiness, is_watch_page, wait_for_media,
};
pub use reinit::{HostConnector, RELOAD_REQUIRED, ReinitPolicy, SpawnedHost};

use thiserror::Error;

use crate::capture::CaptureError;
use crate::delivery::DeliveryError;
use crate::export::ExportError;
use crate::storage::StorageError;

/// Failure of a page operation. It has already been shown to the user when
/// an operation returns it.
#[derive(Debug, Error)]
pub enum PageError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("No screenshots to view!")]
    NothingToView,

    #[error("No screenshots to reset!")]
    NothingToReset,

    #[error("No screenshots to export!")]
    NothingToExport,

    #[error("Extension needs to be reloaded. Please refresh the page.")]
    ReloadRequired,
}

impl PageError {
    /// Whether the host context went away underneath the operation.
    pub fn is_context_invalidated(&self) -> bool {
        matches!(
            self,
            PageError::Delivery(DeliveryError::ContextInvalidated)
                | PageError::Export(ExportError::Delivery(DeliveryError::ContextInvalidated))
        )
    }
}
