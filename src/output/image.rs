//! Single raster image output

use crate::error::Result;
use crate::raster::PixelBuffer;

/// An encoded PNG together with its pixel size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    pub width: u32,
    pub height: u32,
    pub png_data: Vec<u8>,
}

impl Screenshot {
    pub fn from_buffer(buffer: &PixelBuffer) -> Result<Self> {
        Ok(Self {
            width: buffer.width(),
            height: buffer.height(),
            png_data: buffer.to_png()?,
        })
    }
}

/// Encode `buffer` as PNG, downscaled to `max_width` pixels when wider.
/// A `max_width` of zero keeps the rendered size.
pub fn encode_png(buffer: &PixelBuffer, max_width: u32) -> Result<Screenshot> {
    if max_width > 0 && buffer.width() > max_width {
        Screenshot::from_buffer(&buffer.resize_to_width(max_width))
    } else {
        Screenshot::from_buffer(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::WHITE;

    #[test]
    fn wide_buffers_are_downscaled() {
        let buffer = PixelBuffer::new(2400, 100, WHITE);
        let shot = encode_png(&buffer, 1200).unwrap();
        assert_eq!((shot.width, shot.height), (1200, 50));
        assert_eq!(&shot.png_data[1..4], b"PNG");
    }

    #[test]
    fn narrow_buffers_are_kept() {
        let buffer = PixelBuffer::new(300, 10, WHITE);
        let shot = encode_png(&buffer, 1200).unwrap();
        assert_eq!(shot.width, 300);
    }
}
