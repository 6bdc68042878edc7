//! Deep clone of a live subtree with resolved styles inlined.
//!
//! The clone is walked in lockstep with its source: every source child maps
//! to exactly one clone child, so styles resolved for a source node land on
//! its twin. Synthetic spans for generated content are lifted back into the
//! pseudo slots instead of being counted as children.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::dom::{LiveData, NodeId};
use crate::error::{Error, Result, Warning};
use crate::host::{Rect, RenderHost};
use crate::node::{Element, Node};
use crate::style::{AllowList, Priority, StyleMap, StyleResolver};

/// How element boxes are placed in the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositioningMode {
    /// Keep normal flow; only computed styles are copied
    #[default]
    Flow,
    /// Pin every element to its laid-out border box with absolute offsets
    Explicit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotOptions {
    pub positioning: PositioningMode,
    pub strip_class_attributes: bool,
}

pub struct SnapshotBuilder<'a, H: RenderHost + ?Sized> {
    host: &'a H,
    resolver: StyleResolver<'a>,
    options: SnapshotOptions,
    warnings: Vec<Warning>,
}

impl<'a, H: RenderHost + ?Sized> SnapshotBuilder<'a, H> {
    pub fn new(host: &'a H, allow_list: &'a AllowList, options: SnapshotOptions) -> Self {
        Self {
            host,
            resolver: StyleResolver::new(allow_list),
            options,
            warnings: Vec::new(),
        }
    }

    /// Snapshot the subtree rooted at `root`
    pub fn snapshot(&mut self, root: NodeId) -> Result<Node> {
        let doc = self.host.document();
        if !doc.is_element(root) {
            return Err(Error::DetachedRoot(format!("{} is not an element", root)));
        }
        if !doc.is_attached(root) {
            return Err(Error::DetachedRoot(format!(
                "{} is not connected to the document",
                root
            )));
        }
        let mut node = self.clone_node(root)?;
        if self.options.positioning == PositioningMode::Explicit {
            if let (Some(el), Some(rect)) = (node.as_element_mut(), self.host.geometry(root)) {
                pin_size(&mut el.style, &rect);
            }
        }
        Ok(node)
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }

    fn clone_node(&mut self, source: NodeId) -> Result<Node> {
        let host = self.host;
        let doc = host.document();
        let data = doc
            .data(source)
            .ok_or_else(|| Error::DetachedRoot(format!("{} was removed", source)))?;
        let live = match data {
            LiveData::Text(text) => return Ok(Node::Text(text.clone())),
            LiveData::Element(el) => el,
        };

        let resolved = self.resolver.resolve(host, source, &mut self.warnings);
        let mut clone = Element::new(live.tag.clone());
        for (name, value) in &live.attrs {
            let name = name.to_ascii_lowercase();
            if name == "style" || (self.options.strip_class_attributes && name == "class") {
                continue;
            }
            clone.attributes.insert(name, value.clone());
        }
        clone.style = resolved.style;
        clone.pseudo_before = resolved.before.map(Box::new);
        clone.pseudo_after = resolved.after.map(Box::new);

        let mut sources = Vec::new();
        for &child in doc.children(source) {
            match doc.pseudo_position(child) {
                Some(position) => {
                    let lifted = self.clone_node(child)?;
                    clone.pseudo_slot_mut(position).get_or_insert(Box::new(lifted));
                }
                None => {
                    clone.children.push(self.clone_node(child)?);
                    sources.push(child);
                }
            }
        }
        if clone.children.len() != sources.len() {
            return Err(Error::StructureMismatch {
                tag: live.tag.clone(),
                source_children: sources.len(),
                clone_children: clone.children.len(),
            });
        }

        if self.options.positioning == PositioningMode::Explicit {
            self.pin_children(source, &sources, &mut clone);
        }
        trace!("Cloned <{}> {}", live.tag, source);
        Ok(Node::Element(clone))
    }

    /// Give each element child absolute offsets within `parent`
    fn pin_children(&self, parent: NodeId, sources: &[NodeId], clone: &mut Element) {
        let Some(parent_rect) = self.host.geometry(parent) else {
            return;
        };
        let border_left = px(&clone.style, "border-left-width");
        let border_top = px(&clone.style, "border-top-width");
        let mut pinned_any = false;
        for (source, child) in sources.iter().zip(clone.children.iter_mut()) {
            let (Some(el), Some(rect)) = (child.as_element_mut(), self.host.geometry(*source))
            else {
                continue;
            };
            force(&mut el.style, "position", "absolute");
            force(
                &mut el.style,
                "left",
                &format_px(rect.x - parent_rect.x - border_left),
            );
            force(
                &mut el.style,
                "top",
                &format_px(rect.y - parent_rect.y - border_top),
            );
            pin_size(&mut el.style, &rect);
            pinned_any = true;
        }
        if pinned_any {
            let static_position = clone
                .style
                .get("position")
                .map_or(true, |p| p.trim() == "static");
            if static_position {
                force(&mut clone.style, "position", "relative");
            }
        }
    }
}

fn pin_size(style: &mut StyleMap, rect: &Rect) {
    force(style, "box-sizing", "border-box");
    force(style, "width", &format_px(rect.width));
    force(style, "height", &format_px(rect.height));
}

fn force(style: &mut StyleMap, property: &str, value: &str) {
    style.remove(property);
    style.set(property, value, Priority::Normal);
}

fn px(style: &StyleMap, property: &str) -> f32 {
    style
        .get(property)
        .and_then(|v| v.trim().trim_end_matches("px").parse::<f32>().ok())
        .unwrap_or(0.0)
}

/// Two decimals at most, trailing zeros dropped
pub(crate) fn format_px(value: f32) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let mut s = format!("{:.2}", rounded);
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    if s == "-0" {
        s = "0".to_string();
    }
    format!("{}px", s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::LiveDocument;
    use crate::host::PropertyMap;
    use crate::node::PseudoPosition;
    use crate::raster::{PixelBuffer, WHITE};

    /// Host whose computed style is the element's inline style, with
    /// geometry stacked in 10px rows
    struct InlineHost {
        doc: LiveDocument,
    }

    impl RenderHost for InlineHost {
        fn document(&self) -> &LiveDocument {
            &self.doc
        }
        fn document_mut(&mut self) -> &mut LiveDocument {
            &mut self.doc
        }
        fn computed_style(&self, node: NodeId, pseudo: Option<PseudoPosition>) -> PropertyMap {
            if pseudo.is_some() {
                return PropertyMap::new();
            }
            StyleMap::parse(self.doc.attr(node, "style").unwrap_or(""))
                .iter()
                .map(|(k, v)| (k.to_string(), v.value.clone()))
                .collect()
        }
        fn geometry(&self, node: NodeId) -> Option<Rect> {
            Some(Rect::new(5.0, node.index() as f32 * 10.0, 100.0, 10.0))
        }
        fn rasterize(&self, _node: NodeId, width_px: u32) -> Result<PixelBuffer> {
            Ok(PixelBuffer::new(width_px, 1, WHITE))
        }
    }

    fn host(markup: &str) -> InlineHost {
        InlineHost {
            doc: LiveDocument::parse_fragment(markup),
        }
    }

    #[test]
    fn clone_mirrors_structure_and_styles() {
        let h = host(r#"<div class="card" style="color: red"><p>One</p> <p style="margin-top: 2px">Two</p></div>"#);
        let root = h.doc.children(h.doc.preview_root())[0];
        let list = AllowList::full();
        let mut builder = SnapshotBuilder::new(&h, &list, SnapshotOptions::default());
        let node = builder.snapshot(root).unwrap();
        let el = node.as_element().unwrap();
        assert_eq!(el.tag, "div");
        assert_eq!(el.attr("class"), Some("card"));
        assert!(el.attr("style").is_none());
        assert_eq!(el.style.get("color"), Some("red"));
        assert_eq!(el.children.len(), 3);
        assert_eq!(node.text_content(), "One Two");
        let second = el.children[2].as_element().unwrap();
        assert_eq!(second.style.get("margin-top"), Some("2px"));
    }

    #[test]
    fn detached_root_is_rejected() {
        let mut h = host("<div><span>x</span></div>");
        let root = h.doc.children(h.doc.preview_root())[0];
        h.doc.detach(root);
        let list = AllowList::full();
        let mut builder = SnapshotBuilder::new(&h, &list, SnapshotOptions::default());
        assert!(matches!(builder.snapshot(root), Err(Error::DetachedRoot(_))));
    }

    #[test]
    fn strips_class_attributes_on_request() {
        let h = host(r#"<div class="a"><b class="b">x</b></div>"#);
        let root = h.doc.children(h.doc.preview_root())[0];
        let list = AllowList::full();
        let options = SnapshotOptions {
            strip_class_attributes: true,
            ..Default::default()
        };
        let node = SnapshotBuilder::new(&h, &list, options).snapshot(root).unwrap();
        assert!(node.elements().iter().all(|e| e.attr("class").is_none()));
    }

    #[test]
    fn synthetic_children_return_to_pseudo_slots() {
        let h = host(r#"<p><span data-pagesnap-pseudo="before">#</span>body</p>"#);
        let root = h.doc.children(h.doc.preview_root())[0];
        let list = AllowList::full();
        let node = SnapshotBuilder::new(&h, &list, SnapshotOptions::default())
            .snapshot(root)
            .unwrap();
        let el = node.as_element().unwrap();
        assert_eq!(el.children, vec![Node::text("body")]);
        assert!(el.pseudo_before.is_some());
        assert_eq!(node.text_content(), "#body");
    }

    #[test]
    fn explicit_mode_pins_children() {
        let h = host("<div><p>a</p><p>b</p></div>");
        let root = h.doc.children(h.doc.preview_root())[0];
        let list = AllowList::full();
        let options = SnapshotOptions {
            positioning: PositioningMode::Explicit,
            ..Default::default()
        };
        let node = SnapshotBuilder::new(&h, &list, options).snapshot(root).unwrap();
        let el = node.as_element().unwrap();
        assert_eq!(el.style.get("position"), Some("relative"));
        assert_eq!(el.style.get("height"), Some("10px"));
        let first = el.children[0].as_element().unwrap();
        assert_eq!(first.style.get("position"), Some("absolute"));
        assert_eq!(first.style.get("left"), Some("0px"));
        assert_eq!(first.style.get("width"), Some("100px"));
        let offset = (h.doc.children(root)[0].index() - root.index()) as f32 * 10.0;
        assert_eq!(first.style.get("top"), Some(format_px(offset).as_str()));
    }

    #[test]
    fn px_formatting() {
        assert_eq!(format_px(12.0), "12px");
        assert_eq!(format_px(12.5), "12.5px");
        assert_eq!(format_px(1.0 / 3.0), "0.33px");
        assert_eq!(format_px(-0.001), "0px");
    }
}
