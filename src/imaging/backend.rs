//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three pixel operations the
//! transform pipeline needs: decode, resample, and encode. Canvas allocation
//! and progress reporting live in [`operations`](super::operations) so every
//! backend gets the same failure points and progress sequence.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate.

use image::RgbImage;
use thiserror::Error;

use super::params::Quality;

/// Why a single transform failed.
///
/// The `Display` text is the user-facing message shown on a failed job;
/// `reason` carries the underlying detail for logs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("Failed to decode the input image.")]
    DecodeFailed { reason: String },
    #[error("Failed to resize the image.")]
    ResizeFailed { reason: String },
    #[error("Failed to encode the image as JPEG.")]
    EncodeFailed { reason: String },
}

impl TransformError {
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::DecodeFailed {
            reason: reason.into(),
        }
    }

    pub fn resize(reason: impl Into<String>) -> Self {
        Self::ResizeFailed {
            reason: reason.into(),
        }
    }

    pub fn encode(reason: impl Into<String>) -> Self {
        Self::EncodeFailed {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::DecodeFailed { reason }
            | Self::ResizeFailed { reason }
            | Self::EncodeFailed { reason } => reason,
        }
    }
}

/// Trait for image processing backends.
///
/// Implementations must be stateless between calls: the orchestrator shares
/// one backend across all worker threads.
pub trait ImageBackend: Send + Sync {
    /// Decode raw bytes (any supported container) into an RGB bitmap.
    fn decode(&self, bytes: &[u8]) -> Result<RgbImage, TransformError>;

    /// Resample `source` into `canvas`, filling it completely.
    fn resample(&self, source: &RgbImage, canvas: &mut RgbImage) -> Result<(), TransformError>;

    /// Encode `canvas` as a baseline JPEG.
    fn encode_jpeg(&self, canvas: &RgbImage, quality: Quality) -> Result<Vec<u8>, TransformError>;
}
