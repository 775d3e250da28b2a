//! Raw input providers.
//!
//! The orchestrator never reads files itself: each input is an
//! [`ImageSource`] that yields its bytes on demand, on the worker thread that
//! processes it.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("Failed to decode the input image.")]
    Unreadable {
        label: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to decode the input image.")]
    Empty { label: String },
}

/// A handle to raw image bytes.
pub trait ImageSource: Send + Sync {
    /// Human-readable name, used as the job label.
    fn label(&self) -> String;

    /// Fetch the bytes. Empty data is an error.
    fn load(&self) -> Result<Vec<u8>, InputError>;
}

/// An image file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ImageSource for FileSource {
    fn label(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    fn load(&self) -> Result<Vec<u8>, InputError> {
        let bytes = std::fs::read(&self.path).map_err(|source| InputError::Unreadable {
            label: self.label(),
            source,
        })?;
        non_empty(self.label(), bytes)
    }
}

/// Bytes already in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    label: String,
    bytes: Vec<u8>,
}

impl MemorySource {
    pub fn new(label: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            label: label.into(),
            bytes: bytes.into(),
        }
    }
}

impl ImageSource for MemorySource {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn load(&self) -> Result<Vec<u8>, InputError> {
        non_empty(self.label.clone(), self.bytes.clone())
    }
}

fn non_empty(label: String, bytes: Vec<u8>) -> Result<Vec<u8>, InputError> {
    if bytes.is_empty() {
        Err(InputError::Empty { label })
    } else {
        Ok(bytes)
    }
}
