use cairo::{Context, Format, ImageSurface};
use chrono::Utc;

use super::media::MediaPage;
use super::types::{CaptureError, CaptureId, CaptureRecord};

/// Format a playback position as zero-padded `HH:MM:SS`.
///
/// Hours are unbounded; fractional seconds truncate. Negative and non-finite
/// positions format as zero.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}

/// Draws the current frame of a page's media element into an offscreen
/// surface and encodes it as PNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameCapturer;

impl FrameCapturer {
    pub fn new() -> Self {
        Self
    }

    pub fn capture(&self, page: &dyn MediaPage) -> Result<CaptureRecord, CaptureError> {
        let element = page.media_element().ok_or(CaptureError::NoMediaElement)?;

        let (width, height) = element.native_size();
        if width == 0 || height == 0 {
            return Err(CaptureError::CaptureFailed(
                "media element has no decoded frame".to_string(),
            ));
        }

        let surface = ImageSurface::create(Format::ARgb32, width as i32, height as i32)
            .map_err(|e| CaptureError::CaptureFailed(format!("offscreen surface: {}", e)))?;
        let ctx = Context::new(&surface)
            .map_err(|e| CaptureError::CaptureFailed(format!("rendering context: {}", e)))?;

        element.render(&ctx)?;
        drop(ctx);

        let mut image = Vec::new();
        surface
            .write_to_png(&mut image)
            .map_err(|e| CaptureError::CaptureFailed(format!("PNG encoding: {}", e)))?;

        let timestamp = element.current_time().max(0.0);
        log::debug!(
            "Captured {}x{} frame at {:.3}s ({} bytes)",
            width,
            height,
            timestamp,
            image.len()
        );

        Ok(CaptureRecord {
            id: CaptureId::new(),
            image,
            timestamp,
            time_formatted: format_time(timestamp),
            caption: String::new(),
            captured_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::media::{StaticPage, StillFrame};
    use crate::capture::tests::solid_png;
    use std::sync::Arc;

    #[test]
    fn format_time_examples() {
        assert_eq!(format_time(0.0), "00:00:00");
        assert_eq!(format_time(3661.0), "01:01:01");
        assert_eq!(format_time(59.9), "00:00:59");
        assert_eq!(format_time(360_000.0), "100:00:00");
        assert_eq!(format_time(-5.0), "00:00:00");
        assert_eq!(format_time(f64::NAN), "00:00:00");
    }

    #[test]
    fn capture_without_element_fails() {
        let err = FrameCapturer::new()
            .capture(&StaticPage::empty())
            .unwrap_err();
        assert!(matches!(err, CaptureError::NoMediaElement));
    }

    #[test]
    fn capture_encodes_png_at_native_size() {
        let frame = StillFrame::from_png(solid_png(40, 30), 75.4).unwrap();
        let page = StaticPage::new(Some(Arc::new(frame)), "https://www.youtube.com/watch?v=x");

        let record = FrameCapturer::new().capture(&page).unwrap();
        assert_eq!(&record.image[0..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
        assert_eq!(record.timestamp, 75.4);
        assert_eq!(record.time_formatted, "00:01:15");
        assert!(record.caption.is_empty());

        let decoded = crate::capture::media::decode_png(&record.image).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 30));
    }
}
