//! Document rendering backend.
//!
//! The paginated export talks to the renderer only through [`DocumentBackend`]
//! and [`Document`]. The backend is loaded lazily through a [`RendererHandle`]
//! the first time a document is needed and reused afterwards.

use std::sync::Arc;

use async_trait::async_trait;
use cairo::{Context, Filter, PdfSurface};
use thiserror::Error;
use tokio::sync::OnceCell;

use super::ExportError;
use super::layout::{MM_PER_POINT, PAGE_HEIGHT_MM, PAGE_WIDTH_MM, Placement, mm_to_points};
use crate::capture::media::decode_png;
use crate::settings::ImageQuality;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct RenderError(pub String);

/// Options applied to a new document.
#[derive(Debug, Clone)]
pub struct DocumentOptions {
    /// Pango font family for timestamp and caption text.
    pub font_family: String,
    pub quality: ImageQuality,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            font_family: "Sans".to_string(),
            quality: ImageQuality::High,
        }
    }
}

/// A document under construction. Coordinates are millimetres from the
/// top-left corner of the page; font sizes are points.
pub trait Document {
    /// Page width and height.
    fn page_size(&self) -> (f64, f64);

    /// Start a new page. The first page exists from creation.
    fn add_page(&mut self) -> Result<(), RenderError>;

    /// Draw a single line of text with its baseline at `y`.
    fn text(&mut self, text: &str, x: f64, y: f64, font_size: f64) -> Result<(), RenderError>;

    /// Pixel dimensions of a PNG image.
    fn image_properties(&self, png: &[u8]) -> Result<(u32, u32), RenderError>;

    fn add_image(&mut self, png: &[u8], placement: Placement) -> Result<(), RenderError>;

    /// Finish the document and return its encoded bytes.
    fn finish(self: Box<Self>) -> Result<Vec<u8>, RenderError>;
}

/// Factory for documents.
pub trait DocumentBackend: Send + Sync {
    fn create(&self, options: &DocumentOptions) -> Result<Box<dyn Document>, RenderError>;
}

/// Loads a backend. Called at most once per successful load.
#[async_trait]
pub trait RendererLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn DocumentBackend>, ExportError>;
}

/// Memoized, lazily loaded renderer.
pub struct RendererHandle {
    loader: Arc<dyn RendererLoader>,
    backend: OnceCell<Arc<dyn DocumentBackend>>,
}

impl RendererHandle {
    pub fn new(loader: Arc<dyn RendererLoader>) -> Self {
        Self {
            loader,
            backend: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.backend.initialized()
    }

    /// The loaded backend, loading it on first use. A failed load is not
    /// cached, so the next call tries again.
    pub async fn get(&self) -> Result<Arc<dyn DocumentBackend>, ExportError> {
        self.backend
            .get_or_try_init(|| async {
                let backend = self.loader.load().await?;
                log::debug!("PDF renderer loaded");
                Ok(backend)
            })
            .await
            .cloned()
    }
}

impl Default for RendererHandle {
    fn default() -> Self {
        Self::new(Arc::new(CairoPdfLoader))
    }
}

/// Loads [`CairoPdfBackend`] after checking cairo can open a PDF stream.
pub struct CairoPdfLoader;

#[async_trait]
impl RendererLoader for CairoPdfLoader {
    async fn load(&self) -> Result<Arc<dyn DocumentBackend>, ExportError> {
        let probe = PdfSurface::for_stream(1.0, 1.0, Vec::<u8>::new())
            .map_err(|e| ExportError::LibraryLoadFailed(e.to_string()))?;
        drop(probe);
        Ok(Arc::new(CairoPdfBackend))
    }
}

/// PDF documents rendered with cairo, text laid out with pango.
pub struct CairoPdfBackend;

impl DocumentBackend for CairoPdfBackend {
    fn create(&self, options: &DocumentOptions) -> Result<Box<dyn Document>, RenderError> {
        let surface = PdfSurface::for_stream(
            mm_to_points(PAGE_WIDTH_MM),
            mm_to_points(PAGE_HEIGHT_MM),
            Vec::<u8>::new(),
        )
        .map_err(|e| RenderError(format!("failed to create PDF surface: {}", e)))?;
        let ctx = Context::new(&surface)
            .map_err(|e| RenderError(format!("failed to create PDF context: {}", e)))?;

        // Draw in millimetres.
        ctx.scale(1.0 / MM_PER_POINT, 1.0 / MM_PER_POINT);

        Ok(Box::new(CairoPdfDocument {
            surface,
            ctx,
            font_family: options.font_family.clone(),
            filter: filter_for(options.quality),
        }))
    }
}

fn filter_for(quality: ImageQuality) -> Filter {
    match quality {
        ImageQuality::Low => Filter::Fast,
        ImageQuality::Medium => Filter::Good,
        ImageQuality::High => Filter::Best,
    }
}

struct CairoPdfDocument {
    surface: PdfSurface,
    ctx: Context,
    font_family: String,
    filter: Filter,
}

impl Document for CairoPdfDocument {
    fn page_size(&self) -> (f64, f64) {
        (PAGE_WIDTH_MM, PAGE_HEIGHT_MM)
    }

    fn add_page(&mut self) -> Result<(), RenderError> {
        self.ctx
            .show_page()
            .map_err(|e| RenderError(format!("failed to add page: {}", e)))
    }

    fn text(&mut self, text: &str, x: f64, y: f64, font_size: f64) -> Result<(), RenderError> {
        let layout = pangocairo::functions::create_layout(&self.ctx);

        let mut font_desc = pango::FontDescription::from_string(&self.font_family);
        font_desc.set_absolute_size(font_size * MM_PER_POINT * pango::SCALE as f64);
        layout.set_font_description(Some(&font_desc));
        layout.set_text(text);

        // Pango positions from the top-left, the caller gives the baseline
        let baseline = layout.baseline() as f64 / pango::SCALE as f64;

        self.ctx.set_source_rgb(0.0, 0.0, 0.0);
        self.ctx.move_to(x, y - baseline);
        pangocairo::functions::show_layout(&self.ctx, &layout);
        self.ctx
            .status()
            .map_err(|e| RenderError(format!("failed to draw text: {}", e)))
    }

    fn image_properties(&self, png: &[u8]) -> Result<(u32, u32), RenderError> {
        let image = decode_png(png).map_err(RenderError)?;
        Ok((image.width().max(0) as u32, image.height().max(0) as u32))
    }

    fn add_image(&mut self, png: &[u8], placement: Placement) -> Result<(), RenderError> {
        let image = decode_png(png).map_err(RenderError)?;
        let (width, height) = (image.width() as f64, image.height() as f64);
        if width <= 0.0 || height <= 0.0 {
            return Err(RenderError("image has no pixels".to_string()));
        }

        self.ctx
            .save()
            .map_err(|e| RenderError(e.to_string()))?;
        self.ctx.translate(placement.x, placement.y);
        self.ctx
            .scale(placement.width / width, placement.height / height);
        let painted = self
            .ctx
            .set_source_surface(&image, 0.0, 0.0)
            .and_then(|_| {
                self.ctx.source().set_filter(self.filter);
                self.ctx.paint()
            });
        self.ctx
            .restore()
            .map_err(|e| RenderError(e.to_string()))?;

        painted.map_err(|e| RenderError(format!("failed to place image: {}", e)))
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>, RenderError> {
        let CairoPdfDocument { surface, ctx, .. } = *self;
        drop(ctx);

        let stream = surface
            .finish_output_stream()
            .map_err(|e| RenderError(format!("failed to finish PDF: {}", e)))?;
        stream
            .downcast::<Vec<u8>>()
            .map(|bytes| *bytes)
            .map_err(|_| RenderError("PDF stream has unexpected type".to_string()))
    }
}
