//! Display list built from a layout tree

use super::cascade::ComputedStyle;
use super::layout::{LayoutBox, TextRun};
use super::values::{parse_color, split_commas, split_components};
use crate::raster::Rgba;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Rgba,
}

/// Paint operations in device pixels
#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    SolidRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        rgba: Rgba,
    },
    LinearGradient {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        /// CSS convention: 0deg points up, 90deg right
        angle_deg: f32,
        stops: Vec<GradientStop>,
    },
    Text {
        x: i32,
        y: i32,
        text: String,
        font_size: f32,
        monospace: bool,
        bold: bool,
        rgba: Rgba,
    },
}

/// A parsed `background-image` layer
#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    Linear { angle_deg: f32, stops: Vec<GradientStop> },
    Solid(Rgba),
}

/// First gradient layer of a `background-image` value. Radial and conic
/// gradients fall back to the average of their stops.
pub fn parse_gradient(value: &str, current: Rgba) -> Option<Fill> {
    for layer in split_commas(value) {
        let lower = layer.to_ascii_lowercase();
        let Some(open) = lower.find('(') else { continue };
        let name = &lower[..open];
        if !name.ends_with("gradient") || !lower.ends_with(')') {
            continue;
        }
        let inner = &layer[open + 1..layer.len() - 1];
        let mut args = split_commas(inner);
        let mut angle = 180.0;
        let linear = name.ends_with("linear-gradient");
        if let Some(first) = args.first() {
            let first = first.to_ascii_lowercase();
            let direction = if linear { parse_direction(&first) } else { None };
            if let Some(a) = direction {
                angle = a;
                args.remove(0);
            } else if !linear && parse_color(split_components(&first).first()?, current).is_none() {
                // radial shape/position prelude
                args.remove(0);
            }
        }
        let stops = parse_stops(&args, current)?;
        if linear {
            return Some(Fill::Linear {
                angle_deg: angle,
                stops,
            });
        }
        let n = stops.len() as u32;
        let mut sum = [0u32; 4];
        for stop in &stops {
            for (s, c) in sum.iter_mut().zip(stop.color) {
                *s += c as u32;
            }
        }
        return Some(Fill::Solid(sum.map(|s| (s / n) as u8)));
    }
    None
}

fn parse_direction(arg: &str) -> Option<f32> {
    if let Some(dir) = arg.strip_prefix("to ") {
        let mut words: Vec<&str> = dir.split_whitespace().collect();
        words.sort_unstable();
        return match words.as_slice() {
            ["top"] => Some(0.0),
            ["right"] => Some(90.0),
            ["bottom"] => Some(180.0),
            ["left"] => Some(270.0),
            ["right", "top"] => Some(45.0),
            ["bottom", "right"] => Some(135.0),
            ["bottom", "left"] => Some(225.0),
            ["left", "top"] => Some(315.0),
            _ => None,
        };
    }
    let units: [(&str, f32); 4] = [
        ("deg", 1.0),
        ("grad", 0.9),
        ("rad", 180.0 / std::f32::consts::PI),
        ("turn", 360.0),
    ];
    units.iter().find_map(|(unit, factor)| {
        arg.strip_suffix(unit)
            .and_then(|n| n.trim().parse::<f32>().ok())
            .map(|n| n * factor)
    })
}

fn parse_stops(args: &[String], current: Rgba) -> Option<Vec<GradientStop>> {
    let mut parsed: Vec<(Rgba, Option<f32>)> = Vec::new();
    for arg in args {
        let parts = split_components(arg);
        let color = parse_color(parts.first()?, current)?;
        let offset = parts
            .get(1)
            .and_then(|p| p.strip_suffix('%'))
            .and_then(|p| p.parse::<f32>().ok())
            .map(|p| p / 100.0);
        parsed.push((color, offset));
    }
    if parsed.is_empty() {
        return None;
    }
    let last = parsed.len().saturating_sub(1).max(1) as f32;
    let stops = parsed
        .iter()
        .enumerate()
        .map(|(i, (color, offset))| GradientStop {
            offset: offset.unwrap_or(i as f32 / last),
            color: *color,
        })
        .collect();
    Some(stops)
}

fn fade(color: Rgba, opacity: f32) -> Rgba {
    [
        color[0],
        color[1],
        color[2],
        (color[3] as f32 * opacity).round() as u8,
    ]
}

struct Painter {
    origin: (f32, f32),
    scale: f32,
    commands: Vec<PaintCommand>,
}

impl Painter {
    /// CSS rectangle to device pixels, snapping both edges
    fn device(&self, x: f32, y: f32, width: f32, height: f32) -> Option<(i32, i32, u32, u32)> {
        let x0 = ((x - self.origin.0) * self.scale).round();
        let y0 = ((y - self.origin.1) * self.scale).round();
        let x1 = ((x + width - self.origin.0) * self.scale).round();
        let y1 = ((y + height - self.origin.1) * self.scale).round();
        (x1 > x0 && y1 > y0).then(|| (x0 as i32, y0 as i32, (x1 - x0) as u32, (y1 - y0) as u32))
    }

    fn rect(&mut self, x: f32, y: f32, width: f32, height: f32, rgba: Rgba) {
        if rgba[3] == 0 {
            return;
        }
        if let Some((x, y, width, height)) = self.device(x, y, width, height) {
            self.commands.push(PaintCommand::SolidRect {
                x,
                y,
                width,
                height,
                rgba,
            });
        }
    }

    fn paint_box(&mut self, b: &LayoutBox, opacity: f32) {
        let opacity = match &b.style {
            Some(style) => opacity * style.get("opacity").parse::<f32>().unwrap_or(1.0).clamp(0.0, 1.0),
            None => opacity,
        };
        if opacity <= 0.0 {
            return;
        }
        if let Some(style) = &b.style {
            if style.is("visibility", "visible") {
                self.paint_background(b, style, opacity);
                self.paint_borders(b, style, opacity);
            }
        }
        for run in &b.text {
            self.paint_text(run, opacity);
        }
        for child in &b.children {
            self.paint_box(child, opacity);
        }
    }

    fn paint_background(&mut self, b: &LayoutBox, style: &ComputedStyle, opacity: f32) {
        let r = b.rect;
        self.rect(r.x, r.y, r.width, r.height, fade(style.color("background-color"), opacity));
        let image = style.get("background-image");
        if image == "none" || image.is_empty() {
            return;
        }
        match parse_gradient(image, style.color("color")) {
            Some(Fill::Solid(color)) => self.rect(r.x, r.y, r.width, r.height, fade(color, opacity)),
            Some(Fill::Linear { angle_deg, stops }) => {
                if let Some((x, y, width, height)) = self.device(r.x, r.y, r.width, r.height) {
                    let stops = stops
                        .into_iter()
                        .map(|s| GradientStop {
                            offset: s.offset,
                            color: fade(s.color, opacity),
                        })
                        .collect();
                    self.commands.push(PaintCommand::LinearGradient {
                        x,
                        y,
                        width,
                        height,
                        angle_deg,
                        stops,
                    });
                }
            }
            None => {}
        }
    }

    fn paint_borders(&mut self, b: &LayoutBox, style: &ComputedStyle, opacity: f32) {
        let r = b.rect;
        let e = b.border;
        let color = |side: &str| fade(style.color(&format!("border-{}-color", side)), opacity);
        if e.top > 0.0 {
            self.rect(r.x, r.y, r.width, e.top, color("top"));
        }
        if e.bottom > 0.0 {
            self.rect(r.x, r.bottom() - e.bottom, r.width, e.bottom, color("bottom"));
        }
        if e.left > 0.0 {
            self.rect(r.x, r.y + e.top, e.left, r.height - e.vertical(), color("left"));
        }
        if e.right > 0.0 {
            self.rect(r.right() - e.right, r.y + e.top, e.right, r.height - e.vertical(), color("right"));
        }
    }

    fn paint_text(&mut self, run: &TextRun, opacity: f32) {
        let font = &run.style;
        if !font.visible || run.text.trim().is_empty() {
            return;
        }
        let rgba = fade(font.color, opacity);
        if let Some((x, y, _, _)) = self.device(run.x, run.y, 1.0, 1.0) {
            self.commands.push(PaintCommand::Text {
                x,
                y,
                text: run.text.clone(),
                font_size: font.size * self.scale,
                monospace: font.monospace,
                bold: font.bold,
                rgba,
            });
        }
        let thickness = (font.size / 14.0).max(1.0);
        if font.underline {
            self.rect(run.x, run.y + font.size * 0.92, run.width(), thickness, rgba);
        }
        if font.line_through {
            self.rect(run.x, run.y + font.size * 0.55, run.width(), thickness, rgba);
        }
    }
}

/// Paint operations for `root`, with its margin box at the device origin
pub fn build_display_list(root: &LayoutBox, scale: f32) -> Vec<PaintCommand> {
    let mut painter = Painter {
        origin: (root.rect.x - root.margin.left, root.rect.y - root.margin.top),
        scale,
        commands: Vec::new(),
    };
    painter.paint_box(root, 1.0);
    painter.commands
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Rgba = [0, 0, 0, 255];

    #[test]
    fn parses_linear_gradients() {
        let fill = parse_gradient("linear-gradient(to right, red, blue 80%)", BLACK).unwrap();
        assert_eq!(
            fill,
            Fill::Linear {
                angle_deg: 90.0,
                stops: vec![
                    GradientStop { offset: 0.0, color: [255, 0, 0, 255] },
                    GradientStop { offset: 0.8, color: [0, 0, 255, 255] },
                ],
            }
        );
        let Some(Fill::Linear { angle_deg, stops }) =
            parse_gradient("url(a.png), linear-gradient(45deg, #000, #fff, #000)", BLACK)
        else {
            panic!("expected a linear gradient");
        };
        assert_eq!(angle_deg, 45.0);
        assert_eq!(stops[1].offset, 0.5);
    }

    #[test]
    fn radial_gradients_average_their_stops() {
        assert_eq!(
            parse_gradient("radial-gradient(circle at center, #000, #fff)", BLACK),
            Some(Fill::Solid([127, 127, 127, 255]))
        );
        assert_eq!(parse_gradient("url(x.png)", BLACK), None);
    }
}
