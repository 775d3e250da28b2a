//! Shared test utilities for the pixbatch test suite.
//!
//! Synthetic images are generated in memory so tests never depend on fixture
//! files. The gradient pattern gives the encoders something non-trivial to
//! compress.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let png = png_bytes(400, 300);
//! let source = memory_source("a.png", png);
//! ```

use std::io::Cursor;
use std::sync::Arc;

use image::{ImageFormat, RgbImage};

use crate::source::{ImageSource, MemorySource};

// =========================================================================
// Synthetic images
// =========================================================================

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ])
    })
}

fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    gradient(width, height).write_to(&mut out, format).unwrap();
    out.into_inner()
}

/// PNG-encoded gradient of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Png)
}

/// JPEG-encoded gradient of the given size.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Jpeg)
}

// =========================================================================
// Sources
// =========================================================================

/// Wrap bytes as a shareable in-memory source.
pub fn memory_source(label: &str, bytes: Vec<u8>) -> Arc<dyn ImageSource> {
    Arc::new(MemorySource::new(label, bytes))
}

/// A batch of `count` valid PNG sources labelled `img-0.png`, `img-1.png`, ...
pub fn png_sources(count: usize, width: u32, height: u32) -> Vec<Arc<dyn ImageSource>> {
    let bytes = png_bytes(width, height);
    (0..count)
        .map(|i| memory_source(&format!("img-{i}.png"), bytes.clone()))
        .collect()
}
