//! High-level image operations.
//!
//! [`transform`] runs one decode → resize → encode pass for a single target
//! size and reports progress at fixed checkpoints:
//!
//! ```text
//! decode ─ 0.1 ─ scale ─ 0.3 ─ allocate canvas ─ 0.6 ─ resample ─ 0.9 ─ encode ─ 1.0
//! ```
//!
//! Values are strictly increasing and end at exactly `1.0` on success. A
//! failure stops the sequence where it happened; nothing is reported after it.

use super::backend::{ImageBackend, TransformError};
use super::calculations::{calculate_fit_dimensions, calculate_scale};
use super::params::Quality;
use image::RgbImage;
use tracing::debug;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, TransformError>;

pub const PROGRESS_DECODED: f64 = 0.1;
pub const PROGRESS_SCALED: f64 = 0.3;
pub const PROGRESS_CANVAS: f64 = 0.6;
pub const PROGRESS_RESAMPLED: f64 = 0.9;
pub const PROGRESS_DONE: f64 = 1.0;

/// Produce a JPEG no larger than `max_dimension` on its longer edge.
///
/// Stateless and reentrant: concurrent calls share nothing but `backend`.
pub fn transform(
    backend: &impl ImageBackend,
    input: &[u8],
    max_dimension: u32,
    quality: Quality,
    mut on_progress: impl FnMut(f64),
) -> Result<Vec<u8>> {
    let source = backend.decode(input)?;
    on_progress(PROGRESS_DECODED);

    let original = source.dimensions();
    let scale = calculate_scale(original, max_dimension);
    let (width, height) = calculate_fit_dimensions(original, max_dimension);
    debug!(
        from = ?original,
        to = ?(width, height),
        scale,
        "computed target size"
    );
    on_progress(PROGRESS_SCALED);

    let mut canvas = allocate_canvas(width, height)?;
    on_progress(PROGRESS_CANVAS);

    backend.resample(&source, &mut canvas)?;
    drop(source);
    on_progress(PROGRESS_RESAMPLED);

    let encoded = backend.encode_jpeg(&canvas, quality)?;
    on_progress(PROGRESS_DONE);
    Ok(encoded)
}

/// Allocate a zeroed RGB canvas, failing instead of aborting when memory is short.
pub fn allocate_canvas(width: u32, height: u32) -> Result<RgbImage> {
    if width == 0 || height == 0 {
        return Err(TransformError::resize(format!(
            "Empty canvas {width}x{height}"
        )));
    }
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|px| px.checked_mul(3))
        .ok_or_else(|| TransformError::resize(format!("Canvas {width}x{height} overflows")))?;

    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|e| TransformError::resize(format!("Canvas {width}x{height}: {e}")))?;
    buffer.resize(len, 0);
    RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| TransformError::resize(format!("Canvas {width}x{height} has wrong length")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::RustBackend;
    use crate::imaging::backend::tests::{FailAt, MockBackend, RecordedOp};
    use crate::test_helpers::png_bytes;

    fn run(backend: &impl ImageBackend, input: &[u8], max: u32) -> (Result<Vec<u8>>, Vec<f64>) {
        let mut progress = Vec::new();
        let result = transform(backend, input, max, Quality::default(), |p| progress.push(p));
        (result, progress)
    }

    #[test]
    fn success_reports_all_checkpoints_in_order() {
        let (result, progress) = run(&MockBackend::new(), b"img", 32);
        assert!(result.is_ok());
        assert_eq!(progress, vec![0.1, 0.3, 0.6, 0.9, 1.0]);
    }

    #[test]
    fn decode_failure_reports_nothing() {
        let (result, progress) = run(&MockBackend::failing_at(FailAt::Decode), b"img", 32);
        assert!(matches!(result, Err(TransformError::DecodeFailed { .. })));
        assert!(progress.is_empty());
    }

    #[test]
    fn resample_failure_stops_after_canvas() {
        let (result, progress) = run(&MockBackend::failing_at(FailAt::Resample), b"img", 32);
        assert!(matches!(result, Err(TransformError::ResizeFailed { .. })));
        assert_eq!(progress, vec![0.1, 0.3, 0.6]);
    }

    #[test]
    fn encode_failure_never_reaches_one() {
        let (result, progress) = run(&MockBackend::failing_at(FailAt::Encode), b"img", 32);
        assert!(matches!(result, Err(TransformError::EncodeFailed { .. })));
        assert_eq!(progress, vec![0.1, 0.3, 0.6, 0.9]);
    }

    #[test]
    fn zero_area_target_is_resize_failure() {
        // 10000x1 at 256 → 256x0
        let backend = MockBackend::with_size(10_000, 1);
        let (result, progress) = run(&backend, b"img", 256);
        assert!(matches!(result, Err(TransformError::ResizeFailed { .. })));
        assert_eq!(progress, vec![0.1, 0.3]);
        // Resample never ran
        assert_eq!(backend.get_operations().len(), 1);
    }

    #[test]
    fn large_input_is_bounded_by_max_dimension() {
        let backend = MockBackend::with_size(4000, 3000);
        let (result, _) = run(&backend, b"img", 1024);
        assert!(result.is_ok());

        let ops = backend.get_operations();
        assert!(matches!(
            &ops[1],
            RecordedOp::Resample {
                from: (4000, 3000),
                to: (1024, 768)
            }
        ));
        assert!(matches!(
            &ops[2],
            RecordedOp::Encode {
                size: (1024, 768),
                quality: 90
            }
        ));
    }

    #[test]
    fn small_input_is_not_upscaled() {
        let backend = MockBackend::with_size(100, 80);
        run(&backend, b"img", 1024).0.unwrap();
        assert!(matches!(
            &backend.get_operations()[1],
            RecordedOp::Resample { to: (100, 80), .. }
        ));
    }

    #[test]
    fn allocate_canvas_rejects_empty() {
        assert!(matches!(
            allocate_canvas(0, 10),
            Err(TransformError::ResizeFailed { .. })
        ));
    }

    #[test]
    fn allocate_canvas_rejects_absurd_sizes() {
        assert!(matches!(
            allocate_canvas(u32::MAX, u32::MAX),
            Err(TransformError::ResizeFailed { .. })
        ));
    }

    #[test]
    fn allocate_canvas_is_zeroed() {
        let canvas = allocate_canvas(3, 2).unwrap();
        assert_eq!(canvas.dimensions(), (3, 2));
        assert!(canvas.as_raw().iter().all(|&b| b == 0));
    }

    // =========================================================================
    // Real backend
    // =========================================================================

    #[test]
    fn real_transform_resizes_png_to_jpeg() {
        let (result, progress) = run(&RustBackend::new(), &png_bytes(400, 300), 128);
        let jpeg = result.unwrap();

        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (128, 96));
        assert_eq!(
            image::guess_format(&jpeg).unwrap(),
            image::ImageFormat::Jpeg
        );
        assert_eq!(progress.last(), Some(&1.0));
        assert!(progress.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn real_transform_keeps_small_images_at_size() {
        let (result, _) = run(&RustBackend::new(), &png_bytes(10, 10), 256);
        let decoded = image::load_from_memory(&result.unwrap()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (10, 10));
    }

    #[test]
    fn real_transform_rejects_text_as_decode_failure() {
        for _ in 0..3 {
            let (result, progress) = run(&RustBackend::new(), b"not-an-image", 100);
            assert!(matches!(result, Err(TransformError::DecodeFailed { .. })));
            assert!(progress.is_empty());
        }
    }
}
