//! Export artifact writers

pub mod html;
pub mod image;
pub mod pdf;
pub mod svg;

use serde::{Deserialize, Serialize};

use crate::node::{Element, Node};
use crate::style::StyleMap;

pub use self::html::{serialize, HtmlOptions};
pub use self::image::{encode_png, Screenshot};
pub use self::pdf::{write_pdf, PageImageEncoding};
pub use self::svg::{write_svg, SvgBody, SvgOptions};

/// Style of the container every export wraps its roots in
pub const WRAPPER_STYLE: &str = "width: 100%; height: 100%; background: #ffffff;";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    StaticHtml,
    Pdf,
    Image,
    Svg,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::StaticHtml => "html",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Image => "png",
            ExportFormat::Svg => "svg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::StaticHtml => "text/html",
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Image => "image/png",
            ExportFormat::Svg => "image/svg+xml",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Artifact {
    StaticHtml(String),
    Pdf { bytes: Vec<u8>, pages: usize },
    Image(Screenshot),
    Svg(String),
}

impl Artifact {
    pub fn format(&self) -> ExportFormat {
        match self {
            Artifact::StaticHtml(_) => ExportFormat::StaticHtml,
            Artifact::Pdf { .. } => ExportFormat::Pdf,
            Artifact::Image(_) => ExportFormat::Image,
            Artifact::Svg(_) => ExportFormat::Svg,
        }
    }

    /// Encoded bytes as they would be written to a file
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Artifact::StaticHtml(s) | Artifact::Svg(s) => s.as_bytes(),
            Artifact::Pdf { bytes, .. } => bytes,
            Artifact::Image(shot) => &shot.png_data,
        }
    }
}

/// Wrap snapshot roots in the white full-size export container
pub fn wrap_roots(roots: Vec<Node>) -> Node {
    let mut wrapper = Element::new("div");
    wrapper.style = StyleMap::parse(WRAPPER_STYLE);
    wrapper.children = roots;
    Node::Element(wrapper)
}

/// Standalone HTML for a wrapped export tree
pub fn render_static_html(tree: &Node, options: &HtmlOptions) -> String {
    serialize(tree, options)
}
