//! Parameter types for image operations.
//!
//! - [`Quality`] — JPEG encoding quality on a 0.0–1.0 scale (default 0.9). Clamped on construction.
//! - [`TargetSize`] — A named rendition with its longest-edge limit.

use serde::{Deserialize, Serialize};

/// Lossy encoding quality in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quality(f32);

impl Quality {
    /// Clamp `value` into `0.0..=1.0`. NaN becomes the default.
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self::default();
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// The equivalent on the JPEG encoder's 1–100 scale.
    pub fn to_jpeg_percent(self) -> u8 {
        (self.0 * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(0.9)
    }
}

/// A rendition produced for every job: a label and the longest-edge limit in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSize {
    pub label: &'static str,
    pub max_dimension: u32,
}
