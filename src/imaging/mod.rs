//! Image transform service — pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (JPEG, PNG, TIFF, WebP) |
//! | **Resize** | Lanczos3 via `image::imageops::resize` |
//! | **Encode** | `image::codecs::jpeg::JpegEncoder` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: [`Quality`] and [`TargetSize`]
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: [`transform`], which sequences the backend calls and reports progress

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{ImageBackend, TransformError};
pub use calculations::{calculate_fit_dimensions, calculate_scale};
pub use operations::{allocate_canvas, transform};
pub use params::{Quality, TargetSize};
pub use rust_backend::RustBackend;
