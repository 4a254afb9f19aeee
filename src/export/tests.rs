use std::sync::{Arc, Mutex};

use super::{
    ExportError,
    layout::{PAGE_HEIGHT_MM, PAGE_WIDTH_MM, Placement},
    pdf::{PdfOptions, assemble_pdf},
    renderer::{CairoPdfBackend, Document, DocumentBackend, DocumentOptions, RenderError},
};
use crate::capture::tests::record_at;
use crate::capture::media::decode_png;
use crate::settings::ImageQuality;

#[derive(Debug, Clone, PartialEq)]
enum Op {
    Page,
    Text(String, f64),
    Image(Placement),
}

/// Backend that records every drawing operation per created document.
#[derive(Clone, Default)]
struct RecordingBackend {
    ops: Arc<Mutex<Vec<Op>>>,
    created: Arc<Mutex<usize>>,
}

struct RecordingDocument {
    ops: Arc<Mutex<Vec<Op>>>,
}

impl DocumentBackend for RecordingBackend {
    fn create(&self, _options: &DocumentOptions) -> Result<Box<dyn Document>, RenderError> {
        *self.created.lock().unwrap() += 1;
        Ok(Box::new(RecordingDocument {
            ops: self.ops.clone(),
        }))
    }
}

impl Document for RecordingDocument {
    fn page_size(&self) -> (f64, f64) {
        (PAGE_WIDTH_MM, PAGE_HEIGHT_MM)
    }

    fn add_page(&mut self) -> Result<(), RenderError> {
        self.ops.lock().unwrap().push(Op::Page);
        Ok(())
    }

    fn text(&mut self, text: &str, _x: f64, y: f64, _size: f64) -> Result<(), RenderError> {
        self.ops.lock().unwrap().push(Op::Text(text.to_string(), y));
        Ok(())
    }

    fn image_properties(&self, png: &[u8]) -> Result<(u32, u32), RenderError> {
        let image = decode_png(png).map_err(RenderError)?;
        Ok((image.width() as u32, image.height() as u32))
    }

    fn add_image(&mut self, _png: &[u8], placement: Placement) -> Result<(), RenderError> {
        self.ops.lock().unwrap().push(Op::Image(placement));
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>, RenderError> {
        Ok(b"%PDF-recorded".to_vec())
    }
}

/// Split recorded operations into pages.
fn pages(ops: &[Op]) -> Vec<Vec<Op>> {
    let mut pages = vec![Vec::new()];
    for op in ops {
        match op {
            Op::Page => pages.push(Vec::new()),
            other => pages.last_mut().unwrap().push(other.clone()),
        }
    }
    pages
}

#[test]
fn empty_store_produces_nothing() {
    let backend = RecordingBackend::default();
    let err = assemble_pdf(&[], &backend, &PdfOptions::default()).unwrap_err();
    assert!(matches!(err, ExportError::NoCaptures));
    assert_eq!(*backend.created.lock().unwrap(), 0);
}

#[test]
fn one_page_per_capture_in_store_order() {
    let backend = RecordingBackend::default();
    let records = vec![
        record_at(1.0, ""),
        record_at(62.0, "middle"),
        record_at(3600.0, ""),
    ];

    let bytes = assemble_pdf(&records, &backend, &PdfOptions::default()).unwrap();
    assert_eq!(bytes, b"%PDF-recorded");

    let ops = backend.ops.lock().unwrap();
    let pages = pages(&ops);
    assert_eq!(pages.len(), 3);

    let expected_stamps = ["00:00:01", "00:01:02", "01:00:00"];
    for (page, stamp) in pages.iter().zip(expected_stamps) {
        let labels: Vec<_> = page
            .iter()
            .filter(|op| matches!(op, Op::Text(t, _) if t.starts_with("Timestamp: ")))
            .collect();
        assert_eq!(labels, vec![&Op::Text(format!("Timestamp: {}", stamp), 20.0)]);

        let images = page.iter().filter(|op| matches!(op, Op::Image(_))).count();
        assert_eq!(images, 1);
    }

    assert!(pages[1].contains(&Op::Text("Note: middle".into(), 30.0)));
    assert!(
        !pages[0]
            .iter()
            .any(|op| matches!(op, Op::Text(t, _) if t.starts_with("Note: ")))
    );
}

#[test]
fn image_is_placed_below_text_block() {
    let backend = RecordingBackend::default();
    assemble_pdf(&[record_at(0.0, "")], &backend, &PdfOptions::default()).unwrap();

    let ops = backend.ops.lock().unwrap();
    let placement = ops
        .iter()
        .find_map(|op| match op {
            Op::Image(p) => Some(*p),
            _ => None,
        })
        .unwrap();
    // 16x9 source fills 257mm of width.
    assert_eq!((placement.x, placement.y), (20.0, 40.0));
    assert!((placement.width - 257.0).abs() < 1e-9);
    assert!((placement.height - 257.0 * 9.0 / 16.0).abs() < 1e-9);
}

#[test]
fn every_page_has_one_timestamp_label() {
    let backend = RecordingBackend::default();
    let records = vec![
        record_at(1.0, "first"),
        record_at(62.0, ""),
        record_at(3725.0, "third"),
    ];
    let options = PdfOptions {
        document: DocumentOptions {
            quality: ImageQuality::Low,
            ..DocumentOptions::default()
        },
    };
    assemble_pdf(&records, &backend, &options).unwrap();

    let ops = backend.ops.lock().unwrap();
    let labels: Vec<_> = ops
        .iter()
        .filter_map(|op| match op {
            Op::Text(t, _) if t.starts_with("Timestamp: ") => Some(t.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        labels,
        vec![
            "Timestamp: 00:00:01",
            "Timestamp: 00:01:02",
            "Timestamp: 01:02:05"
        ]
    );
    let images = ops.iter().filter(|op| matches!(op, Op::Image(_))).count();
    assert_eq!(images, records.len());
}

#[test]
fn undecodable_image_aborts_with_its_index() {
    let backend = RecordingBackend::default();
    let mut broken = record_at(2.0, "");
    broken.image = b"garbage".to_vec();
    let records = vec![record_at(1.0, ""), broken, record_at(3.0, "")];

    let err = assemble_pdf(&records, &backend, &PdfOptions::default()).unwrap_err();
    assert!(matches!(err, ExportError::ImageRenderFailed { index: 2, .. }));
    assert!(err.to_string().starts_with("Error adding image 2 to PDF"));
}

#[test]
fn cairo_export_produces_pdf_bytes() {
    let records = vec![record_at(1.0, "first"), record_at(2.0, "")];
    let bytes = assemble_pdf(&records, &CairoPdfBackend, &PdfOptions::default()).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}
