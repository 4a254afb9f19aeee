use log::debug;

use super::ExportError;
use super::layout::{
    CAPTION_FONT_SIZE, CAPTION_Y, MARGIN_X, TIMESTAMP_FONT_SIZE, TIMESTAMP_Y, fit_image,
};
use super::renderer::{DocumentBackend, DocumentOptions};
use crate::capture::CaptureRecord;

/// Options for the paginated export.
#[derive(Debug, Clone, Default)]
pub struct PdfOptions {
    pub document: DocumentOptions,
}

/// Render one page per capture, in order, and return the encoded document.
///
/// Every page carries exactly one image and one `Timestamp:` label. Nothing is
/// produced when `records` is empty. A capture whose image cannot be decoded
/// or placed aborts the whole document.
pub fn assemble_pdf(
    records: &[CaptureRecord],
    backend: &dyn DocumentBackend,
    options: &PdfOptions,
) -> Result<Vec<u8>, ExportError> {
    if records.is_empty() {
        return Err(ExportError::NoCaptures);
    }

    debug!("Creating new PDF document");
    let mut doc = backend
        .create(&options.document)
        .map_err(|e| ExportError::DocumentFailed(e.to_string()))?;
    let (page_width, page_height) = doc.page_size();

    for (i, record) in records.iter().enumerate() {
        let index = i + 1;
        debug!("Processing screenshot {} of {}", index, records.len());

        let failed = |reason: String| ExportError::ImageRenderFailed { index, reason };

        if i > 0 {
            doc.add_page().map_err(|e| failed(e.to_string()))?;
        }

        doc.text(
            &format!("Timestamp: {}", record.time_formatted),
            MARGIN_X,
            TIMESTAMP_Y,
            TIMESTAMP_FONT_SIZE,
        )
        .map_err(|e| failed(e.to_string()))?;

        if !record.caption.is_empty() {
            doc.text(
                &format!("Note: {}", record.caption),
                MARGIN_X,
                CAPTION_Y,
                CAPTION_FONT_SIZE,
            )
            .map_err(|e| failed(e.to_string()))?;
        }

        let (width, height) = doc
            .image_properties(&record.image)
            .map_err(|e| failed(e.to_string()))?;
        let placement = fit_image(page_width, page_height, width, height)
            .ok_or_else(|| failed("image has no pixels".to_string()))?;
        doc.add_image(&record.image, placement)
            .map_err(|e| failed(e.to_string()))?;
    }

    debug!("Generating PDF bytes");
    doc.finish()
        .map_err(|e| ExportError::DocumentFailed(e.to_string()))
}
