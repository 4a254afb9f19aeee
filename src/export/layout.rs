//! Page geometry and image placement for document export, in millimetres.

/// Landscape A4.
pub const PAGE_WIDTH_MM: f64 = 297.0;
pub const PAGE_HEIGHT_MM: f64 = 210.0;

/// Left edge of text and image.
pub const MARGIN_X: f64 = 20.0;
/// Total horizontal margin (left + right).
pub const HORIZONTAL_MARGIN: f64 = 40.0;
/// Vertical space reserved for the text block and margins.
pub const VERTICAL_RESERVE: f64 = 50.0;

pub const TIMESTAMP_Y: f64 = 20.0;
pub const CAPTION_Y: f64 = 30.0;
pub const IMAGE_Y: f64 = 40.0;

pub const TIMESTAMP_FONT_SIZE: f64 = 12.0;
pub const CAPTION_FONT_SIZE: f64 = 10.0;

/// Millimetres per PDF point.
pub const MM_PER_POINT: f64 = 25.4 / 72.0;

pub fn mm_to_points(mm: f64) -> f64 {
    mm / MM_PER_POINT
}

/// Where an image lands on a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Fit a `source_width` x `source_height` pixel image onto a page.
///
/// The image fills the page width minus margins; if that makes it taller than
/// the space left below the text block it is scaled down to that height
/// instead. Aspect ratio is preserved in both cases. Returns `None` for an
/// image with a zero dimension.
pub fn fit_image(
    page_width: f64,
    page_height: f64,
    source_width: u32,
    source_height: u32,
) -> Option<Placement> {
    if source_width == 0 || source_height == 0 {
        return None;
    }
    let (sw, sh) = (source_width as f64, source_height as f64);

    let mut width = page_width - HORIZONTAL_MARGIN;
    let mut height = sh * width / sw;

    let max_height = page_height - VERTICAL_RESERVE;
    if height > max_height {
        height = max_height;
        width = sw * height / sh;
    }

    Some(Placement {
        x: MARGIN_X,
        y: IMAGE_Y,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn wide_frame_fills_page_width() {
        // 16:9 at 257mm wide is ~144.6mm tall, under the 160mm budget.
        let placed = fit_image(PAGE_WIDTH_MM, PAGE_HEIGHT_MM, 1920, 1080).unwrap();
        assert!(close(placed.width, 257.0));
        assert!(close(placed.height, 1080.0 * 257.0 / 1920.0));
        assert_eq!((placed.x, placed.y), (20.0, 40.0));
    }

    #[test]
    fn tall_frame_is_clamped_to_height_budget() {
        let placed = fit_image(PAGE_WIDTH_MM, PAGE_HEIGHT_MM, 1080, 1920).unwrap();
        assert!(close(placed.height, 160.0));
        assert!(close(placed.width, 1080.0 * 160.0 / 1920.0));
        assert!(close(placed.width / placed.height, 1080.0 / 1920.0));
    }

    #[test]
    fn degenerate_frame_has_no_placement() {
        assert!(fit_image(PAGE_WIDTH_MM, PAGE_HEIGHT_MM, 0, 10).is_none());
    }

    #[test]
    fn a4_landscape_in_points() {
        assert!((mm_to_points(PAGE_WIDTH_MM) - 841.889).abs() < 0.01);
        assert!((mm_to_points(PAGE_HEIGHT_MM) - 595.276).abs() < 0.01);
    }
}
