//! Delivery of exported artifacts through the host context.
//!
//! The page side never writes files itself: it sends a [`HostRequest`] to the
//! host task and awaits exactly one [`HostResponse`].

pub mod data_url;
pub mod downloads;
pub mod host;
pub mod messages;

pub use downloads::{
    AcceptSuggested, DownloadRequest, Downloads, FileSystemDownloads, FixedLocation, SaveAsPrompt,
    TerminalSavePrompt,
};
pub use host::{DownloadLayout, HostContext, HostHandle};
pub use messages::{
    FailureKind, HostRequest, HostResponse, LifecycleEvent, PageMessage, ScreenshotPayload,
};

use thiserror::Error;

/// Errors surfaced by the delivery channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("Download was cancelled")]
    DeliveryDenied,

    #[error("Error downloading files: {0}")]
    DeliveryFailed(String),

    #[error("Extension context invalidated")]
    ContextInvalidated,

    #[error("{failed} of {total} downloads failed")]
    Partial { failed: usize, total: usize },
}
