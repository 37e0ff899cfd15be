//! Boundary to whatever turns an enrollment URI into a scannable picture.
//!
//! Only plain pixel buffers cross it, so the rest of the crate does not
//! depend on an imaging library.

use crate::error::Result;

/// 8-bit grayscale pixels in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RasterImage {
    pub const LIGHT: u8 = 255;
    pub const DARK: u8 = 0;

    /// A blank (all light) canvas.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Self::LIGHT; width as usize * height as usize],
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Paints the `size`x`size` square whose top-left corner is (`x`, `y`).
    /// Parts outside the canvas are ignored.
    pub fn fill_square(&mut self, x: u32, y: u32, size: u32, value: u8) {
        let x_end = x.saturating_add(size).min(self.width);
        let y_end = y.saturating_add(size).min(self.height);
        for py in y.min(y_end)..y_end {
            let row = py as usize * self.width as usize;
            for px in x.min(x_end)..x_end {
                self.pixels[row + px as usize] = value;
            }
        }
    }
}

/// Turns a payload into a picture of exactly `width`x`height` pixels.
pub trait BarcodeEncoder {
    fn encode(&self, payload: &str, width: u32, height: u32) -> Result<RasterImage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_canvas_is_light() {
        let img = RasterImage::blank(3, 2);
        assert_eq!(img.pixels.len(), 6);
        assert_eq!(img.pixel(2, 1), Some(RasterImage::LIGHT));
        assert_eq!(img.pixel(3, 0), None);
    }

    #[test]
    fn fill_square_clips_to_canvas() {
        let mut img = RasterImage::blank(4, 4);
        img.fill_square(2, 2, 5, RasterImage::DARK);
        assert_eq!(img.pixel(1, 1), Some(RasterImage::LIGHT));
        assert_eq!(img.pixel(2, 2), Some(RasterImage::DARK));
        assert_eq!(img.pixel(3, 3), Some(RasterImage::DARK));
        assert_eq!(
            img.pixels.iter().filter(|&&p| p == RasterImage::DARK).count(),
            4
        );
    }
}
