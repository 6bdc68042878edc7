//! Software rasterizer for display lists

use super::layout::char_advance;
use super::paint::{GradientStop, PaintCommand};
use crate::raster::{PixelBuffer, Rgba};

/// Execute `commands` onto a transparent `width` x `height` buffer
pub fn rasterize(commands: &[PaintCommand], width: u32, height: u32) -> PixelBuffer {
    let mut buffer = PixelBuffer::new(width, height, [0, 0, 0, 0]);
    for command in commands {
        match command {
            PaintCommand::SolidRect {
                x,
                y,
                width,
                height,
                rgba,
            } => buffer.fill_rect(*x as i64, *y as i64, *width as i64, *height as i64, *rgba),
            PaintCommand::LinearGradient {
                x,
                y,
                width,
                height,
                angle_deg,
                stops,
            } => fill_gradient(&mut buffer, (*x, *y, *width, *height), *angle_deg, stops),
            PaintCommand::Text {
                x,
                y,
                text,
                font_size,
                monospace,
                bold,
                rgba,
            } => draw_glyphs(&mut buffer, *x, *y, text, *font_size, *monospace, *bold, *rgba),
        }
    }
    buffer
}

fn fill_gradient(
    buffer: &mut PixelBuffer,
    (x, y, width, height): (i32, i32, u32, u32),
    angle_deg: f32,
    stops: &[GradientStop],
) {
    if stops.is_empty() {
        return;
    }
    let (sin, cos) = angle_deg.to_radians().sin_cos();
    let (w, h) = (width as f32, height as f32);
    let length = (w * sin.abs() + h * cos.abs()).max(1.0);
    let (cx, cy) = (x as f32 + w / 2.0, y as f32 + h / 2.0);
    let y0 = y.max(0);
    let y1 = (y + height as i32).min(buffer.height() as i32);
    let x0 = x.max(0);
    let x1 = (x + width as i32).min(buffer.width() as i32);
    for py in y0..y1 {
        for px in x0..x1 {
            let dx = px as f32 + 0.5 - cx;
            let dy = py as f32 + 0.5 - cy;
            let t = (dx * sin - dy * cos) / length + 0.5;
            buffer.blend_pixel(px as u32, py as u32, sample(stops, t));
        }
    }
}

fn sample(stops: &[GradientStop], t: f32) -> Rgba {
    let first = stops[0];
    if t <= first.offset {
        return first.color;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = (b.offset - a.offset).max(f32::EPSILON);
            let f = ((t - a.offset) / span).clamp(0.0, 1.0);
            let mut out = [0u8; 4];
            for (i, o) in out.iter_mut().enumerate() {
                *o = (a.color[i] as f32 + (b.color[i] as f32 - a.color[i] as f32) * f).round() as u8;
            }
            return out;
        }
    }
    stops[stops.len() - 1].color
}

/// Glyphs are drawn as solid boxes inside their advance
#[allow(clippy::too_many_arguments)]
fn draw_glyphs(
    buffer: &mut PixelBuffer,
    x: i32,
    y: i32,
    text: &str,
    font_size: f32,
    monospace: bool,
    bold: bool,
    rgba: Rgba,
) {
    let ink = if bold { 0.88 } else { 0.76 };
    let mut pen = x as f32;
    for c in text.chars() {
        let advance = char_advance(c, font_size, monospace);
        if !c.is_whitespace() {
            let gx = pen + advance * (1.0 - ink) / 2.0;
            let gy = y as f32 + font_size * 0.2;
            buffer.fill_rect(
                gx.round() as i64,
                gy.round() as i64,
                (advance * ink).round().max(1.0) as i64,
                (font_size * 0.7).round().max(1.0) as i64,
                rgba,
            );
        }
        pen += advance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_rects_are_clipped_to_the_buffer() {
        let commands = [PaintCommand::SolidRect {
            x: -2,
            y: 1,
            width: 4,
            height: 10,
            rgba: [255, 0, 0, 255],
        }];
        let buffer = rasterize(&commands, 4, 4);
        assert_eq!(buffer.pixel(0, 1), Some([255, 0, 0, 255]));
        assert_eq!(buffer.pixel(2, 1), Some([0, 0, 0, 0]));
        assert_eq!(buffer.pixel(0, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn horizontal_gradient_runs_left_to_right() {
        let commands = [PaintCommand::LinearGradient {
            x: 0,
            y: 0,
            width: 100,
            height: 2,
            angle_deg: 90.0,
            stops: vec![
                GradientStop { offset: 0.0, color: [255, 0, 0, 255] },
                GradientStop { offset: 1.0, color: [0, 0, 255, 255] },
            ],
        }];
        let buffer = rasterize(&commands, 100, 2);
        let left = buffer.pixel(0, 0).unwrap();
        let right = buffer.pixel(99, 1).unwrap();
        assert!(left[0] > 250 && left[2] < 5);
        assert!(right[2] > 250 && right[0] < 5);
    }

    #[test]
    fn text_leaves_ink() {
        let commands = [PaintCommand::Text {
            x: 0,
            y: 0,
            text: "Hi".into(),
            font_size: 20.0,
            monospace: false,
            bold: false,
            rgba: [0, 0, 0, 255],
        }];
        let buffer = rasterize(&commands, 20, 20);
        assert_eq!(buffer.pixel(5, 10), Some([0, 0, 0, 255]));
        assert_eq!(buffer.pixel(5, 1), Some([0, 0, 0, 0]));
    }
}
