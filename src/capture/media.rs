//! Media elements a frame can be captured from.
//!
//! A [`MediaPage`] stands in for the page hosting the player: it may or may
//! not currently expose a [`MediaElement`]. Elements know their native pixel
//! size, their playback position, and how to draw their current frame into a
//! cairo context.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use cairo::ImageSurface;

use super::types::CaptureError;

/// A page-embedded element that renders video frames.
pub trait MediaElement: Send + Sync {
    /// Native pixel dimensions of the current frame.
    fn native_size(&self) -> (u32, u32);

    /// Playback position in seconds.
    fn current_time(&self) -> f64;

    /// Draw the current frame at the origin of `ctx`, unscaled.
    fn render(&self, ctx: &cairo::Context) -> Result<(), CaptureError>;
}

/// The page a player lives on.
pub trait MediaPage: Send + Sync {
    /// The first renderable media element, if the page has one.
    fn media_element(&self) -> Option<Arc<dyn MediaElement>>;

    /// Current page location.
    fn location(&self) -> String;
}

/// Decode PNG bytes into a cairo surface.
pub fn decode_png(bytes: &[u8]) -> Result<ImageSurface, String> {
    let mut reader = bytes;
    ImageSurface::create_from_png(&mut reader).map_err(|e| e.to_string())
}

fn paint_surface(ctx: &cairo::Context, surface: &ImageSurface) -> Result<(), CaptureError> {
    ctx.set_source_surface(surface, 0.0, 0.0)
        .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
    ctx.paint()
        .map_err(|e| CaptureError::CaptureFailed(e.to_string()))
}

/// A single decoded frame paused at a fixed position.
pub struct StillFrame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    position: f64,
}

impl StillFrame {
    pub fn from_png(bytes: Vec<u8>, position: f64) -> Result<Self, CaptureError> {
        let surface = decode_png(&bytes).map_err(CaptureError::CaptureFailed)?;
        Ok(Self {
            width: surface.width().max(0) as u32,
            height: surface.height().max(0) as u32,
            data: bytes,
            position,
        })
    }

    pub fn open(path: &Path, position: f64) -> Result<Self, CaptureError> {
        let bytes = fs::read(path).map_err(|e| {
            CaptureError::CaptureFailed(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_png(bytes, position)
    }
}

impl MediaElement for StillFrame {
    fn native_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    fn render(&self, ctx: &cairo::Context) -> Result<(), CaptureError> {
        let surface = decode_png(&self.data).map_err(CaptureError::CaptureFailed)?;
        paint_surface(ctx, &surface)
    }
}

/// A directory of PNG frames played back at a constant frame rate.
///
/// Frames are ordered by file name. The frame shown at time `t` is
/// `floor(t * fps)`, clamped to the last frame.
pub struct FrameSequence {
    frames: Vec<PathBuf>,
    fps: f64,
    size: (u32, u32),
    position: Mutex<f64>,
}

impl FrameSequence {
    pub fn open(directory: &Path, fps: f64) -> Result<Self, CaptureError> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(CaptureError::CaptureFailed(format!(
                "invalid frame rate {}",
                fps
            )));
        }

        let entries = fs::read_dir(directory).map_err(|e| {
            CaptureError::CaptureFailed(format!("failed to read {}: {}", directory.display(), e))
        })?;

        let mut frames: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
            })
            .collect();
        frames.sort();

        let first = frames.first().ok_or_else(|| {
            CaptureError::CaptureFailed(format!("no PNG frames in {}", directory.display()))
        })?;
        let first = StillFrame::open(first, 0.0)?;

        log::debug!(
            "Opened frame sequence {} ({} frames at {} fps)",
            directory.display(),
            frames.len(),
            fps
        );

        Ok(Self {
            size: first.native_size(),
            frames,
            fps,
            position: Mutex::new(0.0),
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn duration(&self) -> f64 {
        self.frames.len() as f64 / self.fps
    }

    /// Move the playback position, clamped to the sequence.
    pub fn seek(&self, seconds: f64) {
        let clamped = if seconds.is_finite() {
            seconds.clamp(0.0, self.duration())
        } else {
            0.0
        };
        if let Ok(mut position) = self.position.lock() {
            *position = clamped;
        }
    }

    pub fn frame_index_at(&self, seconds: f64) -> usize {
        let index = (seconds.max(0.0) * self.fps).floor() as usize;
        index.min(self.frames.len().saturating_sub(1))
    }
}

impl MediaElement for FrameSequence {
    fn native_size(&self) -> (u32, u32) {
        self.size
    }

    fn current_time(&self) -> f64 {
        self.position.lock().map(|p| *p).unwrap_or(0.0)
    }

    fn render(&self, ctx: &cairo::Context) -> Result<(), CaptureError> {
        let path = &self.frames[self.frame_index_at(self.current_time())];
        let frame = StillFrame::open(path, 0.0)?;
        frame.render(ctx)
    }
}

/// A page with a fixed (possibly absent) media element.
pub struct StaticPage {
    element: Option<Arc<dyn MediaElement>>,
    location: String,
}

impl StaticPage {
    pub fn new(element: Option<Arc<dyn MediaElement>>, location: impl Into<String>) -> Self {
        Self {
            element,
            location: location.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(None, "about:blank")
    }
}

impl MediaPage for StaticPage {
    fn media_element(&self) -> Option<Arc<dyn MediaElement>> {
        self.element.clone()
    }

    fn location(&self) -> String {
        self.location.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::tests::solid_png;
    use tempfile::TempDir;

    #[test]
    fn still_frame_reports_png_dimensions() {
        let frame = StillFrame::from_png(solid_png(64, 36), 12.5).unwrap();
        assert_eq!(frame.native_size(), (64, 36));
        assert_eq!(frame.current_time(), 12.5);
    }

    #[test]
    fn still_frame_rejects_non_png() {
        assert!(matches!(
            StillFrame::from_png(b"nope".to_vec(), 0.0),
            Err(CaptureError::CaptureFailed(_))
        ));
    }

    #[test]
    fn frame_sequence_picks_frame_by_position() {
        let temp = TempDir::new().unwrap();
        for i in 0..4 {
            std::fs::write(temp.path().join(format!("{:04}.png", i)), solid_png(8, 8)).unwrap();
        }
        std::fs::write(temp.path().join("notes.txt"), b"ignored").unwrap();

        let sequence = FrameSequence::open(temp.path(), 2.0).unwrap();
        assert_eq!(sequence.frame_count(), 4);
        assert_eq!(sequence.duration(), 2.0);
        assert_eq!(sequence.frame_index_at(0.0), 0);
        assert_eq!(sequence.frame_index_at(0.99), 1);
        assert_eq!(sequence.frame_index_at(1.5), 3);
        assert_eq!(sequence.frame_index_at(60.0), 3);

        sequence.seek(1.25);
        assert_eq!(sequence.current_time(), 1.25);
        sequence.seek(99.0);
        assert_eq!(sequence.current_time(), 2.0);
    }

    #[test]
    fn frame_sequence_requires_frames() {
        let temp = TempDir::new().unwrap();
        assert!(FrameSequence::open(temp.path(), 30.0).is_err());
        assert!(FrameSequence::open(temp.path(), 0.0).is_err());
    }
}
