//! Reference renderer.
//!
//! A [`RenderHost`] with its own cascade, box layout and software
//! rasterizer. It understands the CSS that exported snapshots use: longhand
//! box properties, colors, backgrounds with linear gradients, block and
//! single-line flex layout, absolute positioning. Text is drawn as solid
//! glyph boxes with fixed advances, which keeps output deterministic.

pub mod cascade;
pub mod layout;
pub mod paint;
pub mod raster;
pub mod values;

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use log::debug;

use crate::dom::{LiveDocument, NodeId};
use crate::error::{Error, Result};
use crate::host::{PropertyMap, Rect, RenderHost};
use crate::node::PseudoPosition;
use crate::raster::PixelBuffer;
use crate::Viewport;

use cascade::Cascade;
use layout::{LayoutBox, LayoutEngine, StyleTable};

/// Device pixels per CSS pixel
pub const DEFAULT_SCALE: f32 = 2.0;

/// Tallest canvas the renderer will allocate, in device pixels
pub const DEFAULT_MAX_CANVAS_HEIGHT: u32 = 32_767;

#[derive(Default)]
struct Cache {
    cascade: Option<Arc<Cascade>>,
    styles: Option<Arc<StyleTable>>,
    geometry: Option<Arc<HashMap<NodeId, Rect>>>,
}

pub struct ReferenceRenderer {
    document: LiveDocument,
    viewport: Viewport,
    scale: f32,
    max_canvas_height: u32,
    assets: BTreeMap<String, Vec<u8>>,
    // Cleared on every mutable access to the document
    cache: RefCell<Cache>,
}

impl Default for ReferenceRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceRenderer {
    pub fn new() -> Self {
        Self {
            document: LiveDocument::new(),
            viewport: Viewport::default(),
            scale: DEFAULT_SCALE,
            max_canvas_height: DEFAULT_MAX_CANVAS_HEIGHT,
            assets: BTreeMap::new(),
            cache: RefCell::new(Cache::default()),
        }
    }

    /// A renderer showing `markup` in its preview
    pub fn from_markup(markup: &str) -> Self {
        let mut renderer = Self::new();
        renderer.document = LiveDocument::parse_fragment(markup);
        renderer
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale.max(0.1);
        self
    }

    pub fn with_max_canvas_height(mut self, height: u32) -> Self {
        self.max_canvas_height = height;
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self.invalidate();
        self
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn invalidate(&mut self) {
        *self.cache.get_mut() = Cache::default();
    }

    fn cascade(&self) -> Arc<Cascade> {
        let mut cache = self.cache.borrow_mut();
        let cascade = cache.cascade.get_or_insert_with(|| {
            Arc::new(Cascade::for_document(&self.document, &self.assets, self.viewport))
        });
        Arc::clone(cascade)
    }

    fn styles(&self) -> Arc<StyleTable> {
        if let Some(styles) = &self.cache.borrow().styles {
            return Arc::clone(styles);
        }
        let styles = Arc::new(self.cascade().compute_all(&self.document));
        self.cache.borrow_mut().styles = Some(Arc::clone(&styles));
        styles
    }

    fn geometry_table(&self) -> Arc<HashMap<NodeId, Rect>> {
        if let Some(geometry) = &self.cache.borrow().geometry {
            return Arc::clone(geometry);
        }
        let styles = self.styles();
        let mut table = HashMap::new();
        let engine = LayoutEngine::new(&self.document, &styles);
        if let Some(root) = engine.layout_root(self.document.body(), self.viewport.width as f32) {
            collect_rects(&root, &mut table);
        }
        let table = Arc::new(table);
        self.cache.borrow_mut().geometry = Some(Arc::clone(&table));
        table
    }
}

fn collect_rects(b: &LayoutBox, table: &mut HashMap<NodeId, Rect>) {
    if let Some(id) = b.node {
        table.insert(id, b.rect);
    }
    for child in &b.children {
        collect_rects(child, table);
    }
}

impl RenderHost for ReferenceRenderer {
    fn document(&self) -> &LiveDocument {
        &self.document
    }

    fn document_mut(&mut self) -> &mut LiveDocument {
        self.invalidate();
        &mut self.document
    }

    fn computed_style(&self, node: NodeId, pseudo: Option<PseudoPosition>) -> PropertyMap {
        let styles = self.styles();
        let Some(style) = styles.get(&node) else {
            return PropertyMap::new();
        };
        match pseudo {
            None => style.to_property_map(),
            Some(position) => self
                .cascade()
                .compute(&self.document, node, Some(position), Some(style))
                .to_property_map(),
        }
    }

    fn accepts(&self, property: &str, value: &str) -> bool {
        cascade::accepts(property, value)
    }

    fn geometry(&self, node: NodeId) -> Option<Rect> {
        self.geometry_table().get(&node).copied()
    }

    fn rasterize(&self, node: NodeId, width_px: u32) -> Result<PixelBuffer> {
        if width_px == 0 {
            return Err(Error::Rasterization("cannot render at zero width".into()));
        }
        if !self.document.is_attached(node) || !self.document.is_element(node) {
            return Err(Error::Rasterization(format!("{} is not an attached element", node)));
        }
        let styles = self.styles();
        let root = LayoutEngine::new(&self.document, &styles)
            .layout_root(node, width_px as f32)
            .ok_or_else(|| Error::Rasterization(format!("{} is not displayed", node)))?;

        let css_height = root.margin_height();
        let width = (width_px as f32 * self.scale).round() as u32;
        let height = (css_height * self.scale).ceil() as u32;
        if height == 0 {
            return Err(Error::Rasterization(format!("{} has no height", node)));
        }
        if height > self.max_canvas_height {
            return Err(Error::Rasterization(format!(
                "canvas of {}px exceeds the {}px limit",
                height, self.max_canvas_height
            )));
        }
        let commands = paint::build_display_list(&root, self.scale);
        debug!(
            "Rasterizing {} at {}x{} ({} paint commands)",
            node,
            width,
            height,
            commands.len()
        );
        Ok(raster::rasterize(&commands, width, height))
    }

    fn register_asset(&mut self, url: &str, bytes: &[u8]) {
        debug!("Registered asset {} ({} bytes)", url, bytes.len());
        self.assets.insert(url.to_string(), bytes.to_vec());
        self.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rasterizes_at_device_scale() {
        let renderer = ReferenceRenderer::from_markup(
            r#"<div class="box" style="height: 10px; background: #ff0000"></div>"#,
        );
        let doc = renderer.document();
        let node = doc.elements_with_classes(doc.body(), &["box"])[0];
        let buffer = renderer.rasterize(node, 50).unwrap();
        assert_eq!((buffer.width(), buffer.height()), (100, 20));
        assert_eq!(buffer.pixel(99, 19), Some([255, 0, 0, 255]));
    }

    #[test]
    fn oversized_canvas_is_an_error() {
        let renderer = ReferenceRenderer::from_markup(r#"<div style="height: 100px"></div>"#)
            .with_max_canvas_height(50);
        let preview = renderer.document().preview_root();
        assert!(matches!(
            renderer.rasterize(preview, 100),
            Err(Error::Rasterization(_))
        ));
        assert!(renderer.rasterize(preview, 0).is_err());
    }

    #[test]
    fn cache_follows_document_changes() {
        let mut renderer = ReferenceRenderer::from_markup(r#"<p class="p">x</p>"#);
        let p = {
            let doc = renderer.document();
            doc.elements_with_classes(doc.body(), &["p"])[0]
        };
        assert_eq!(renderer.computed_style(p, None)["color"], "rgb(0, 0, 0)");
        renderer.document_mut().set_attr(p, "style", "color: red");
        assert_eq!(renderer.computed_style(p, None)["color"], "rgb(255, 0, 0)");
    }

    #[test]
    fn geometry_includes_body_margin() {
        let renderer = ReferenceRenderer::from_markup(r#"<div class="d" style="height: 5px"></div>"#);
        let doc = renderer.document();
        let d = doc.elements_with_classes(doc.body(), &["d"])[0];
        let rect = renderer.geometry(d).unwrap();
        assert_eq!((rect.x, rect.y, rect.height), (8.0, 8.0, 5.0));
        assert_eq!(rect.width, 1280.0 - 16.0);
    }

    #[test]
    fn linked_stylesheets_apply_once_registered() {
        let mut renderer = ReferenceRenderer::from_markup(
            r#"<link rel="stylesheet" href="theme.css"><p class="p">x</p>"#,
        );
        let p = {
            let doc = renderer.document();
            doc.elements_with_classes(doc.body(), &["p"])[0]
        };
        assert_eq!(renderer.computed_style(p, None)["margin-top"], "16px");
        renderer.register_asset("theme.css", b".p { margin-top: 3px }");
        assert_eq!(renderer.computed_style(p, None)["margin-top"], "3px");
    }
}
