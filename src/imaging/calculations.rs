//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Scale factor that fits `original` within `max_dimension` on its longer edge.
///
/// Never upscales: the result is capped at `1.0`.
pub fn calculate_scale(original: (u32, u32), max_dimension: u32) -> f64 {
    let longest = original.0.max(original.1);
    if longest == 0 {
        return 1.0;
    }
    (max_dimension as f64 / longest as f64).min(1.0)
}

/// Output dimensions for fitting `original` within `max_dimension`.
///
/// Each side is `floor(side * scale)`, computed in integers so the longer
/// edge lands exactly on the limit (no `1023.999…` rounding down). Either
/// side may come out as zero for extreme aspect ratios; callers treat that
/// as an unallocatable canvas.
///
/// # Examples
/// ```
/// # use pixbatch::imaging::calculate_fit_dimensions;
/// assert_eq!(calculate_fit_dimensions((4000, 3000), 1024), (1024, 768));
/// // Never upscales
/// assert_eq!(calculate_fit_dimensions((200, 100), 1024), (200, 100));
/// ```
pub fn calculate_fit_dimensions(original: (u32, u32), max_dimension: u32) -> (u32, u32) {
    let (width, height) = original;
    let longest = width.max(height);
    if longest <= max_dimension {
        return original;
    }
    let fit = |side: u32| (side as u64 * max_dimension as u64 / longest as u64) as u32;
    (fit(width), fit(height))
}
