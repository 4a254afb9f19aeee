//! Frame capture for tubesnap.
//!
//! This module provides:
//! - Media element and page abstractions
//! - Offscreen frame rendering and PNG encoding
//! - The ordered, persisted capture store
//! - Caption entry bound to stable capture ids

pub mod annotation;
pub mod frame;
pub mod media;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod tests;

pub use annotation::{
    AnnotationFlow, CaptionPrompt, CaptionResponse, PendingAnnotation, PresetCaption,
    TerminalCaptionPrompt,
};
pub use frame::{FrameCapturer, format_time};
pub use media::{FrameSequence, MediaElement, MediaPage, StaticPage, StillFrame};
pub use store::{CaptureStore, SCREENSHOTS_KEY};
pub use types::{CaptureError, CaptureId, CaptureRecord};
