//! Off-screen containers for rendering a snapshot at a fixed width.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::dom::NodeId;
use crate::host::RenderHost;
use crate::node::Node;

/// Attribute marking a scratch container in the live document
pub const SCRATCH_ATTR: &str = "data-pagesnap-scratch";

/// Styling of the container a snapshot is rendered in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScratchStyle {
    pub padding_px: u32,
    pub background: String,
}

impl ScratchStyle {
    /// Border-box width of a container whose content is `content_width_px`
    pub fn outer_width(&self, content_width_px: u32) -> u32 {
        content_width_px + 2 * self.padding_px
    }
}

impl Default for ScratchStyle {
    fn default() -> Self {
        Self {
            padding_px: 20,
            background: "#ffffff".to_string(),
        }
    }
}

/// A container attached to the document body for the lifetime of the
/// guard. Content is laid out `width_px` wide inside the padding. Dropping
/// the guard detaches and frees the container, whether the render that used
/// it succeeded or not.
pub struct Scratch<'h, H: RenderHost + ?Sized> {
    host: &'h mut H,
    container: NodeId,
    outer_width: u32,
}

impl<'h, H: RenderHost + ?Sized> Scratch<'h, H> {
    pub fn acquire(host: &'h mut H, width_px: u32, style: &ScratchStyle) -> Self {
        let css = format!(
            "position: absolute; left: -100000px; top: 0px; width: {}px; padding: {}px; background: {};",
            width_px, style.padding_px, style.background
        );
        let doc = host.document_mut();
        let container = doc.create_element(
            "div",
            vec![
                (SCRATCH_ATTR.to_string(), String::new()),
                ("style".to_string(), css),
            ],
        );
        let body = doc.body();
        doc.append_child(body, container);
        debug!("Attached scratch container {} at {}px", container, width_px);
        Self {
            host,
            container,
            outer_width: style.outer_width(width_px),
        }
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    /// Width of the container including its padding
    pub fn outer_width(&self) -> u32 {
        self.outer_width
    }

    pub fn host(&self) -> &H {
        &*self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut *self.host
    }

    /// Mount a snapshot tree inside the container
    pub fn mount(&mut self, tree: &Node) -> NodeId {
        let doc = self.host.document_mut();
        let id = doc.mount(tree);
        doc.append_child(self.container, id);
        id
    }
}

impl<H: RenderHost + ?Sized> Drop for Scratch<'_, H> {
    fn drop(&mut self) {
        self.host.document_mut().remove_subtree(self.container);
        debug!("Released scratch container {}", self.container);
    }
}
