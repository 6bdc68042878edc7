//! RGBA pixel buffers produced by a render host

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

pub type Rgba = [u8; 4];

pub const WHITE: Rgba = [255, 255, 255, 255];

/// Row-major RGBA8 image
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, fill: Rgba) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            data.extend_from_slice(&fill);
        }
        Self { width, height, data }
    }

    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(Error::Rasterization(format!(
                "buffer of {} bytes does not match {}x{} RGBA",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self { width, height, data })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let o = self.offset(x, y);
        Some([self.data[o], self.data[o + 1], self.data[o + 2], self.data[o + 3]])
    }

    /// Source-over blend `color` onto one pixel
    pub fn blend_pixel(&mut self, x: u32, y: u32, color: Rgba) {
        if x >= self.width || y >= self.height || color[3] == 0 {
            return;
        }
        let o = self.offset(x, y);
        let alpha = color[3] as u32;
        if alpha == 255 {
            self.data[o..o + 4].copy_from_slice(&color);
            return;
        }
        for c in 0..3 {
            let dst = self.data[o + c] as u32;
            self.data[o + c] = ((color[c] as u32 * alpha + dst * (255 - alpha)) / 255) as u8;
        }
        let dst_a = self.data[o + 3] as u32;
        self.data[o + 3] = (alpha + dst_a * (255 - alpha) / 255).min(255) as u8;
    }

    /// Blend a rectangle, clipped to the buffer
    pub fn fill_rect(&mut self, x: i64, y: i64, width: i64, height: i64, color: Rgba) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + width).min(self.width as i64);
        let y1 = (y + height).min(self.height as i64);
        for py in y0..y1 {
            for px in x0..x1 {
                self.blend_pixel(px as u32, py as u32, color);
            }
        }
    }

    /// Rows `[start, end)` as a new buffer
    pub fn crop_rows(&self, start: u32, end: u32) -> PixelBuffer {
        let end = end.min(self.height);
        let start = start.min(end);
        let row = self.width as usize * 4;
        Self {
            width: self.width,
            height: end - start,
            data: self.data[start as usize * row..end as usize * row].to_vec(),
        }
    }

    /// RGB bytes with alpha flattened over white
    pub fn to_rgb(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() / 4 * 3);
        for px in self.data.chunks_exact(4) {
            let a = px[3] as u32;
            for c in &px[..3] {
                out.push(((*c as u32 * a + 255 * (255 - a)) / 255) as u8);
            }
        }
        out
    }

    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        PngEncoder::new(&mut buf).write_image(
            &self.data,
            self.width,
            self.height,
            ExtendedColorType::Rgba8,
        )?;
        Ok(buf)
    }

    /// Encode as baseline JPEG; `quality` is clamped to 1..=100
    pub fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).write_image(
            &self.to_rgb(),
            self.width,
            self.height,
            ExtendedColorType::Rgb8,
        )?;
        Ok(buf)
    }

    /// Resample to `width` with a triangle filter, keeping the aspect ratio
    pub fn resize_to_width(&self, width: u32) -> PixelBuffer {
        if width == 0 || width == self.width || self.is_empty() {
            return self.clone();
        }
        let height = ((self.height as u64 * width as u64) / self.width as u64).max(1) as u32;
        let Some(source) = RgbaImage::from_raw(self.width, self.height, self.data.clone()) else {
            return self.clone();
        };
        let resized = imageops::resize(&source, width, height, FilterType::Triangle);
        Self {
            width,
            height,
            data: resized.into_raw(),
        }
    }

    /// SHA-256 over dimensions and pixels, hex encoded
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.width.to_le_bytes());
        hasher.update(self.height.to_le_bytes());
        hasher.update(&self.data);
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_and_crop() {
        let mut buf = PixelBuffer::new(4, 6, WHITE);
        buf.fill_rect(0, 2, 4, 2, [255, 0, 0, 255]);
        let crop = buf.crop_rows(2, 4);
        assert_eq!(crop.height(), 2);
        assert_eq!(crop.pixel(3, 1), Some([255, 0, 0, 255]));
        assert_eq!(buf.crop_rows(5, 99).height(), 1);
    }

    #[test]
    fn rejects_short_buffers() {
        assert!(PixelBuffer::from_rgba(2, 2, vec![0; 15]).is_err());
        assert!(PixelBuffer::from_rgba(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn blends_translucent_colors() {
        let mut buf = PixelBuffer::new(1, 1, WHITE);
        buf.blend_pixel(0, 0, [0, 0, 0, 128]);
        let px = buf.pixel(0, 0).unwrap();
        assert!(px[0] > 120 && px[0] < 135);
    }

    #[test]
    fn encodes_png_and_jpeg() {
        let buf = PixelBuffer::new(3, 2, [10, 20, 30, 255]);
        let png = buf.to_png().unwrap();
        assert_eq!(&png[1..4], b"PNG");
        let jpeg = buf.to_jpeg(100).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = PixelBuffer::new(2, 2, WHITE);
        let mut b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.blend_pixel(1, 1, [0, 0, 0, 255]);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn resize_keeps_aspect() {
        let buf = PixelBuffer::new(100, 50, WHITE);
        let small = buf.resize_to_width(40);
        assert_eq!((small.width(), small.height()), (40, 20));
    }

    #[test]
    fn downscale_keeps_solid_regions() {
        let mut buf = PixelBuffer::new(100, 10, [255, 0, 0, 255]);
        buf.fill_rect(50, 0, 50, 10, [0, 0, 255, 255]);
        let small = buf.resize_to_width(50);
        assert_eq!((small.width(), small.height()), (50, 5));
        assert_eq!(small.pixel(0, 2), Some([255, 0, 0, 255]));
        assert_eq!(small.pixel(49, 2), Some([0, 0, 255, 255]));
        assert_eq!(buf.resize_to_width(0), buf);
    }
}
