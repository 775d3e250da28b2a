//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader` with content sniffing |
//! | Resample | `image::imageops::resize` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |

use super::backend::{ImageBackend, TransformError};
use super::params::Quality;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageEncoder, ImageReader, RgbImage};
use std::io::Cursor;

/// Backend using the `image` crate ecosystem.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<RgbImage, TransformError> {
        // Format comes from the content, never from a file name.
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| TransformError::decode(format!("Failed to sniff format: {e}")))?;
        if reader.format().is_none() {
            return Err(TransformError::decode("Unrecognized image format"));
        }
        let decoded = reader
            .decode()
            .map_err(|e| TransformError::decode(e.to_string()))?;
        Ok(decoded.to_rgb8())
    }

    fn resample(&self, source: &RgbImage, canvas: &mut RgbImage) -> Result<(), TransformError> {
        if source.dimensions() == canvas.dimensions() {
            canvas.copy_from_slice(source.as_raw());
            return Ok(());
        }
        // `imageops::resize` always returns a fresh buffer. Free the reserved
        // canvas first so peak memory holds one target-sized buffer, not two.
        let (width, height) = canvas.dimensions();
        *canvas = RgbImage::new(0, 0);
        let resized = image::imageops::resize(source, width, height, FilterType::Lanczos3);
        if resized.dimensions() != (width, height) {
            return Err(TransformError::resize(format!(
                "Resampler produced {:?}, expected {width}x{height}",
                resized.dimensions()
            )));
        }
        *canvas = resized;
        Ok(())
    }

    fn encode_jpeg(&self, canvas: &RgbImage, quality: Quality) -> Result<Vec<u8>, TransformError> {
        let mut out = Vec::new();
        let (width, height) = canvas.dimensions();
        JpegEncoder::new_with_quality(&mut out, quality.to_jpeg_percent())
            .write_image(canvas.as_raw(), width, height, ExtendedColorType::Rgb8)
            .map_err(|e| TransformError::encode(e.to_string()))?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{jpeg_bytes, png_bytes};

    #[test]
    fn decode_png() {
        let backend = RustBackend::new();
        let img = backend.decode(&png_bytes(40, 30)).unwrap();
        assert_eq!(img.dimensions(), (40, 30));
    }

    #[test]
    fn decode_jpeg() {
        let backend = RustBackend::new();
        let img = backend.decode(&jpeg_bytes(64, 32)).unwrap();
        assert_eq!(img.dimensions(), (64, 32));
    }

    #[test]
    fn decode_text_is_decode_failure() {
        let backend = RustBackend::new();
        let err = backend.decode(b"not-an-image").unwrap_err();
        assert!(matches!(err, TransformError::DecodeFailed { .. }));
    }

    #[test]
    fn decode_truncated_png_is_decode_failure() {
        let backend = RustBackend::new();
        let bytes = png_bytes(50, 50);
        let err = backend.decode(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, TransformError::DecodeFailed { .. }));
    }

    #[test]
    fn resample_fills_smaller_canvas() {
        let backend = RustBackend::new();
        let source = RgbImage::from_pixel(100, 50, image::Rgb([200, 10, 10]));
        let mut canvas = RgbImage::new(50, 25);
        backend.resample(&source, &mut canvas).unwrap();

        // A uniform image stays (nearly) uniform under Lanczos3.
        let px = canvas.get_pixel(25, 12);
        assert!(px[0] > 190 && px[1] < 20);
    }

    #[test]
    fn resample_replaces_whole_canvas_at_its_size() {
        let backend = RustBackend::new();
        let source = RgbImage::from_pixel(90, 30, image::Rgb([10, 200, 30]));
        let mut canvas = RgbImage::new(45, 15);
        backend.resample(&source, &mut canvas).unwrap();

        assert_eq!(canvas.dimensions(), (45, 15));
        assert_eq!(canvas.as_raw().len(), 45 * 15 * 3);
        assert!(canvas.pixels().all(|px| px[1] > 180));
    }

    #[test]
    fn resample_same_size_copies_pixels() {
        let backend = RustBackend::new();
        let source = RgbImage::from_fn(8, 8, |x, y| image::Rgb([x as u8, y as u8, 7]));
        let mut canvas = RgbImage::new(8, 8);
        backend.resample(&source, &mut canvas).unwrap();
        assert_eq!(canvas, source);
    }

    #[test]
    fn encode_produces_jpeg() {
        let backend = RustBackend::new();
        let canvas = RgbImage::from_pixel(32, 16, image::Rgb([0, 128, 255]));
        let bytes = backend.encode_jpeg(&canvas, Quality::default()).unwrap();

        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(
            image::guess_format(&bytes).unwrap(),
            image::ImageFormat::Jpeg
        );
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 16));
    }

    #[test]
    fn lower_quality_encodes_smaller() {
        let backend = RustBackend::new();
        let canvas = RgbImage::from_fn(128, 128, |x, y| {
            image::Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x ^ y) % 256) as u8])
        });
        let high = backend.encode_jpeg(&canvas, Quality::new(1.0)).unwrap();
        let low = backend.encode_jpeg(&canvas, Quality::new(0.1)).unwrap();
        assert!(low.len() < high.len());
    }
}
