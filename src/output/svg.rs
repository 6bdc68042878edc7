//! SVG output sized to the rendered content

use std::collections::BTreeMap;
use std::fmt::Write as _;

use base64::Engine as Base64Engine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::node::Node;
use crate::output::html::{serialize, HtmlOptions};
use crate::raster::{PixelBuffer, Rgba};

/// What the SVG document contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SvgBody {
    /// The snapshot markup inside `<foreignObject>`; stays selectable but
    /// needs an HTML-capable viewer
    ForeignObject,
    /// The rendered pixels as an embedded PNG
    #[default]
    Raster,
    /// The rendered pixels traced into solid-color paths
    Outlined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SvgOptions {
    pub body: SvgBody,
}

/// Write an SVG for `tree`, rendered as `buffer` from a `css_width` wide layout
pub fn write_svg(tree: &Node, buffer: &PixelBuffer, css_width: u32, body: SvgBody) -> Result<String> {
    if buffer.is_empty() || css_width == 0 {
        return Err(Error::Encode("cannot write an SVG for empty content".into()));
    }
    let css_height =
        ((buffer.height() as u64 * css_width as u64) / buffer.width() as u64).max(1) as u32;
    let (vb_w, vb_h) = match body {
        SvgBody::ForeignObject => (css_width, css_height),
        SvgBody::Raster | SvgBody::Outlined => (buffer.width(), buffer.height()),
    };

    let mut svg = String::new();
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\" viewBox=\"0 0 {} {}\">",
        css_width, css_height, vb_w, vb_h
    );
    match body {
        SvgBody::ForeignObject => {
            let markup = serialize(
                tree,
                &HtmlOptions {
                    indent: None,
                    xhtml: true,
                },
            );
            let _ = write!(
                svg,
                "<foreignObject x=\"0\" y=\"0\" width=\"{}\" height=\"{}\"><div xmlns=\"http://www.w3.org/1999/xhtml\">{}</div></foreignObject>",
                css_width, css_height, markup
            );
        }
        SvgBody::Raster => {
            let png = buffer.to_png()?;
            let encoded = base64::engine::general_purpose::STANDARD.encode(png);
            let _ = write!(
                svg,
                "<image x=\"0\" y=\"0\" width=\"{}\" height=\"{}\" href=\"data:image/png;base64,{}\"/>",
                vb_w, vb_h, encoded
            );
        }
        SvgBody::Outlined => {
            for (color, path) in trace_runs(buffer) {
                let _ = write!(svg, "<path fill=\"#{:02x}{:02x}{:02x}\"", color[0], color[1], color[2]);
                if color[3] < 255 {
                    let _ = write!(svg, " fill-opacity=\"{:.3}\"", color[3] as f32 / 255.0);
                }
                let _ = write!(svg, " d=\"{}\"/>", path);
            }
        }
    }
    svg.push_str("</svg>");
    Ok(svg)
}

/// Horizontal runs of identical pixels, grouped into one path per color
fn trace_runs(buffer: &PixelBuffer) -> BTreeMap<Rgba, String> {
    let mut paths: BTreeMap<Rgba, String> = BTreeMap::new();
    for y in 0..buffer.height() {
        let mut x = 0;
        while x < buffer.width() {
            let Some(color) = buffer.pixel(x, y) else {
                break;
            };
            let start = x;
            while x < buffer.width() && buffer.pixel(x, y) == Some(color) {
                x += 1;
            }
            if color[3] == 0 {
                continue;
            }
            let _ = write!(
                paths.entry(color).or_default(),
                "M{} {}h{}v1h-{}z",
                start,
                y,
                x - start,
                x - start
            );
        }
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::WHITE;

    fn sample() -> (Node, PixelBuffer) {
        let mut buffer = PixelBuffer::new(4, 2, WHITE);
        buffer.fill_rect(1, 0, 2, 1, [255, 0, 0, 255]);
        (Node::text("hi"), buffer)
    }

    #[test]
    fn sized_to_content() {
        let (tree, buffer) = sample();
        let svg = write_svg(&tree, &buffer, 2, SvgBody::Raster).unwrap();
        assert!(svg.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"2\" height=\"1\""));
        assert!(svg.contains("data:image/png;base64,"));
    }

    #[test]
    fn outlined_merges_runs_per_color() {
        let (tree, buffer) = sample();
        let svg = write_svg(&tree, &buffer, 4, SvgBody::Outlined).unwrap();
        assert!(svg.contains("fill=\"#ff0000\" d=\"M1 0h2v1h-2z\""));
        assert_eq!(svg.matches("<path").count(), 2);
    }

    #[test]
    fn foreign_object_embeds_markup() {
        let (tree, buffer) = sample();
        let svg = write_svg(&tree, &buffer, 4, SvgBody::ForeignObject).unwrap();
        assert!(svg.contains("<foreignObject"));
        assert!(svg.contains(">hi</div>"));
    }
}
