//! QR rendering for enrollment URIs, built on `qrcode` and `image`.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat};
use qrcode::{Color, EcLevel, QrCode};

use crate::error::{OtpError, Result};
use crate::raster::{BarcodeEncoder, RasterImage};

/// Medium error correction, no quiet zone; the symbol is scaled by the
/// largest whole factor that fits and centered on a light canvas.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrEncoder;

impl BarcodeEncoder for QrEncoder {
    fn encode(&self, payload: &str, width: u32, height: u32) -> Result<RasterImage> {
        let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)
            .map_err(|e| OtpError::ImageEncoding(format!("QR encode error: {}", e)))?;

        let symbol = code.width() as u32;
        let factor = (width / symbol).min(height / symbol);
        if factor == 0 {
            return Err(OtpError::ImageTooSmall {
                symbol,
                width,
                height,
            });
        }

        let offset_x = (width - symbol * factor) / 2;
        let offset_y = (height - symbol * factor) / 2;
        tracing::debug!(symbol, factor, width, height, "rendering QR code");

        let mut img = RasterImage::blank(width, height);
        let matrix = code.to_colors();
        for y in 0..symbol {
            for x in 0..symbol {
                if matrix[(y * symbol + x) as usize] == Color::Dark {
                    img.fill_square(
                        offset_x + x * factor,
                        offset_y + y * factor,
                        factor,
                        RasterImage::DARK,
                    );
                }
            }
        }
        Ok(img)
    }
}

/// PNG bytes of a grayscale raster.
pub fn encode_png(img: &RasterImage) -> Result<Vec<u8>> {
    let gray = GrayImage::from_raw(img.width, img.height, img.pixels.clone())
        .ok_or_else(|| OtpError::ImageEncoding("pixel buffer does not match dimensions".into()))?;

    let mut cursor = Cursor::new(Vec::<u8>::new());
    DynamicImage::ImageLuma8(gray)
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|e| OtpError::ImageEncoding(format!("PNG encode error: {}", e)))?;
    Ok(cursor.into_inner())
}
