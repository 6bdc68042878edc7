//! Rendering a snapshot tree and slicing it into fixed-size pages.

use std::ops::Range;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::host::RenderHost;
use crate::node::Node;
use crate::raster::PixelBuffer;
use crate::scratch::{Scratch, ScratchStyle};

/// Leftover height below which no further page is emitted
const EPSILON: f64 = 1e-9;

const MM_PER_INCH: f64 = 25.4;
const POINTS_PER_INCH: f64 = 72.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    #[default]
    Millimeter,
    Point,
    Inch,
}

impl Unit {
    pub fn to_points(self, value: f64) -> f64 {
        match self {
            Unit::Millimeter => value * POINTS_PER_INCH / MM_PER_INCH,
            Unit::Point => value,
            Unit::Inch => value * POINTS_PER_INCH,
        }
    }
}

/// Page geometry plus the CSS width content is laid out at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub width_units: f64,
    pub height_units: f64,
    pub unit: Unit,
    pub virtual_width_px: u32,
}

impl PageLayout {
    /// A4 portrait, 210 × 297 mm
    pub fn a4(virtual_width_px: u32) -> Self {
        Self {
            width_units: 210.0,
            height_units: 297.0,
            unit: Unit::Millimeter,
            virtual_width_px,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.width_units.is_finite() && self.width_units > 0.0) {
            return Err(Error::ConfigError(format!(
                "page width must be positive, got {}",
                self.width_units
            )));
        }
        if !(self.height_units.is_finite() && self.height_units > 0.0) {
            return Err(Error::ConfigError(format!(
                "page height must be positive, got {}",
                self.height_units
            )));
        }
        if self.virtual_width_px == 0 {
            return Err(Error::ConfigError("virtual width must be non-zero".into()));
        }
        Ok(())
    }
}

impl Default for PageLayout {
    fn default() -> Self {
        Self::a4(800)
    }
}

/// One page: the slice of the rendered image it shows
#[derive(Debug, Clone)]
pub struct Page {
    pub image: PixelBuffer,
    pub width_units: f64,
    pub height_units: f64,
    /// Offset of this slice within the full output height
    pub origin_y: f64,
    /// Height of content on this page; below `height_units` on the last page
    pub content_height_units: f64,
}

impl Page {
    pub fn range(&self) -> Range<f64> {
        self.origin_y..self.origin_y + self.content_height_units
    }
}

#[derive(Debug, Clone)]
pub struct PagedDocument {
    pub pages: Vec<Page>,
    pub unit: Unit,
    pub total_height_units: f64,
}

impl PagedDocument {
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Digest over page geometry and pixels
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for page in &self.pages {
            hasher.update(page.origin_y.to_le_bytes());
            hasher.update(page.content_height_units.to_le_bytes());
            hasher.update(page.image.fingerprint().as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

/// Output height for an image of `pixel_width × pixel_height` scaled to
/// `width_units`
pub fn output_height_units(width_units: f64, pixel_width: u32, pixel_height: u32) -> f64 {
    width_units * pixel_height as f64 / pixel_width as f64
}

/// Render `tree` inside a scratch container whose content box is
/// `width_px` CSS pixels wide. The image covers the whole container, padding
/// included.
///
/// The container is removed again before this returns, on success or
/// failure.
pub async fn rasterize_tree<H: RenderHost + ?Sized>(
    host: &mut H,
    tree: &Node,
    width_px: u32,
    style: &ScratchStyle,
) -> Result<PixelBuffer> {
    let mut scratch = Scratch::acquire(host, width_px, style);
    scratch.mount(tree);
    // let the mounted subtree settle before painting
    tokio::task::yield_now().await;
    let container = scratch.container();
    let buffer = scratch.host().rasterize(container, scratch.outer_width())?;
    debug!(
        "Rasterized snapshot to {}x{} pixels",
        buffer.width(),
        buffer.height()
    );
    Ok(buffer)
}

/// Split a rendered image into pages of `layout`.
///
/// The image is scaled so its width fills the page; page `i` shows output
/// rows `[i·P, min((i+1)·P, total))`. The trailing partial page is kept.
pub fn slice_pages(buffer: &PixelBuffer, layout: &PageLayout) -> Result<PagedDocument> {
    layout.validate()?;
    let (w, h) = (buffer.width(), buffer.height());
    if buffer.is_empty() {
        return Err(Error::Rasterization(format!(
            "cannot paginate an empty {}x{} image",
            w, h
        )));
    }
    let total = output_height_units(layout.width_units, w, h);
    let px_per_unit = w as f64 / layout.width_units;

    let mut pages = Vec::new();
    let mut index = 0usize;
    loop {
        let origin = index as f64 * layout.height_units;
        let remaining = total - origin;
        if remaining <= EPSILON {
            break;
        }
        let content = remaining.min(layout.height_units);
        // a sliver under half a pixel still gets its own page and one row
        let row_start = ((origin * px_per_unit).round() as u32).min(h - 1);
        let row_end = (((origin + content) * px_per_unit).round() as u32).clamp(row_start + 1, h);
        pages.push(Page {
            image: buffer.crop_rows(row_start, row_end),
            width_units: layout.width_units,
            height_units: layout.height_units,
            origin_y: origin,
            content_height_units: content,
        });
        index += 1;
    }
    Ok(PagedDocument {
        pages,
        unit: layout.unit,
        total_height_units: total,
    })
}

/// Render and paginate a snapshot tree
pub async fn paginate<H: RenderHost + ?Sized>(
    host: &mut H,
    tree: &Node,
    layout: &PageLayout,
    style: &ScratchStyle,
) -> Result<PagedDocument> {
    layout.validate()?;
    let buffer = rasterize_tree(host, tree, layout.virtual_width_px, style).await?;
    let paged = slice_pages(&buffer, layout)?;
    info!(
        "Paginated {:.1} units of content into {} page(s)",
        paged.total_height_units,
        paged.len()
    );
    Ok(paged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::WHITE;

    fn layout(width: f64, height: f64) -> PageLayout {
        PageLayout {
            width_units: width,
            height_units: height,
            unit: Unit::Millimeter,
            virtual_width_px: 800,
        }
    }

    #[test]
    fn three_pages_with_partial_tail() {
        let buffer = PixelBuffer::new(210, 650, WHITE);
        let doc = slice_pages(&buffer, &layout(210.0, 297.0)).unwrap();
        assert_eq!(doc.len(), 3);
        let ranges: Vec<_> = doc.pages.iter().map(|p| p.range()).collect();
        assert_eq!(ranges, vec![0.0..297.0, 297.0..594.0, 594.0..650.0]);
        assert_eq!(doc.pages[2].image.height(), 56);
    }

    #[test]
    fn short_content_is_one_page() {
        let buffer = PixelBuffer::new(800, 1000, WHITE);
        let doc = slice_pages(&buffer, &layout(210.0, 297.0)).unwrap();
        assert_eq!(doc.len(), 1);
        assert!((doc.total_height_units - 262.5).abs() < 1e-9);
        assert!((doc.pages[0].content_height_units - 262.5).abs() < 1e-9);
    }

    #[test]
    fn exact_multiple_has_no_empty_tail() {
        let buffer = PixelBuffer::new(100, 200, WHITE);
        let doc = slice_pages(&buffer, &layout(100.0, 100.0)).unwrap();
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn sliver_below_half_a_pixel_gets_a_page() {
        let buffer = PixelBuffer::new(800, 2263, WHITE);
        let doc = slice_pages(&buffer, &PageLayout::a4(800)).unwrap();
        assert!(doc.total_height_units > 594.0);
        assert_eq!(doc.len(), 3);
        let last = &doc.pages[2];
        assert_eq!(last.image.height(), 1);
        assert!((last.range().end - doc.total_height_units).abs() < 1e-9);
    }

    #[test]
    fn page_count_and_coverage_hold_for_every_height() {
        let layout = PageLayout::a4(800);
        for h in 1..=1200u32 {
            let buffer = PixelBuffer::new(80, h, WHITE);
            let doc = slice_pages(&buffer, &layout).unwrap();
            let total = doc.total_height_units;
            let expected = ((total - EPSILON) / layout.height_units).ceil() as usize;
            assert_eq!(doc.len(), expected.max(1), "height {}", h);

            let mut covered = 0.0;
            for page in &doc.pages {
                assert_eq!(page.range().start, covered, "height {}", h);
                assert!(page.content_height_units <= layout.height_units);
                assert!(page.image.height() > 0, "height {}", h);
                covered = page.range().end;
            }
            assert!((covered - total).abs() < 1e-9, "height {}", h);
        }
    }

    #[test]
    fn empty_buffer_is_an_error() {
        let buffer = PixelBuffer::new(0, 0, WHITE);
        assert!(matches!(
            slice_pages(&buffer, &layout(210.0, 297.0)),
            Err(Error::Rasterization(_))
        ));
    }

    #[test]
    fn invalid_layout_is_rejected() {
        let buffer = PixelBuffer::new(10, 10, WHITE);
        assert!(matches!(
            slice_pages(&buffer, &layout(0.0, 297.0)),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn unit_conversion() {
        assert!((Unit::Millimeter.to_points(25.4) - 72.0).abs() < 1e-9);
        assert_eq!(Unit::Inch.to_points(2.0), 144.0);
        assert_eq!(Unit::Point.to_points(5.0), 5.0);
    }
}
