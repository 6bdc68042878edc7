//! The seam between the export pipeline and whatever lays out and paints
//! the document.

use std::collections::BTreeMap;

use crate::dom::{LiveDocument, NodeId};
use crate::error::Result;
use crate::node::PseudoPosition;
use crate::raster::PixelBuffer;

/// Computed property values keyed by longhand name
pub type PropertyMap = BTreeMap<String, String>;

/// Border-box geometry in CSS pixels, relative to the document origin
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }
}

/// A renderer owning the live document.
///
/// Implementations resolve the cascade, lay out, and paint. The pipeline
/// only reads computed values and pixels through this trait, and mutates
/// the document to attach scratch containers.
pub trait RenderHost {
    fn document(&self) -> &LiveDocument;

    fn document_mut(&mut self) -> &mut LiveDocument;

    /// Replace the whole document (e.g. after the markup changed)
    fn load_document(&mut self, document: LiveDocument) {
        *self.document_mut() = document;
    }

    /// Computed longhands for an element or one of its generated boxes.
    /// Generated boxes report `content` alongside their other properties.
    fn computed_style(&self, node: NodeId, pseudo: Option<PseudoPosition>) -> PropertyMap;

    /// Whether the renderer would accept `property: value` as a declaration
    fn accepts(&self, _property: &str, _value: &str) -> bool {
        true
    }

    /// Laid-out border box of an attached element
    fn geometry(&self, node: NodeId) -> Option<Rect>;

    /// Paint `node` laid out at `width_px` CSS pixels wide.
    ///
    /// The returned buffer may be larger than the CSS size when the host
    /// renders at a device scale factor.
    fn rasterize(&self, node: NodeId, width_px: u32) -> Result<PixelBuffer>;

    /// Make a fetched font/icon available to later renders
    fn register_asset(&mut self, _url: &str, _bytes: &[u8]) {}
}
