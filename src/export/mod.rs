//! Export of captures.
//!
//! Two flavours are supported:
//! - a paginated PDF with one capture per landscape A4 page
//! - discrete PNG files plus an `index.txt` manifest

pub mod files;
pub mod layout;
pub mod pdf;
pub mod renderer;

#[cfg(test)]
mod tests;

pub use files::{FileBatch, FileEntry, FileNaming, build_batch, manifest_text};
pub use pdf::{PdfOptions, assemble_pdf};
pub use renderer::{
    CairoPdfBackend, CairoPdfLoader, Document, DocumentBackend, DocumentOptions, RenderError,
    RendererHandle, RendererLoader,
};

use thiserror::Error;

use crate::delivery::DeliveryError;
use crate::storage::StorageError;

/// Errors raised while exporting captures.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No screenshots to generate PDF from!")]
    NoCaptures,

    #[error("Error adding image {index} to PDF: {reason}")]
    ImageRenderFailed { index: usize, reason: String },

    #[error("Failed to load PDF library: {0}")]
    LibraryLoadFailed(String),

    #[error("PDF document error: {0}")]
    DocumentFailed(String),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
