//! Per-job output folders and atomic file writes.
//!
//! ## Output Structure
//!
//! ```text
//! <root>/                      # default: <system temp>/Processed
//! ├── 0b6f…-…-4c1e/            # one folder per job, named by job id
//! │   ├── original.jpg         # input bytes, unmodified
//! │   ├── small.jpg            # medium rendition
//! │   └── thumb.jpg            # thumbnail rendition
//! └── …
//! ```
//!
//! ## Atomicity
//!
//! [`Storage::write_atomic`] writes into a hidden temporary file in the target's
//! own directory, syncs it, then renames it over the target. Readers see
//! either the previous file or the complete new one. On failure the temporary
//! file is removed and the target is untouched.
//!
//! Directory creation goes through `create_dir_all`, which tolerates other
//! threads creating the same directory concurrently.

use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create storage folder.")]
    CannotCreateFolder {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write JPEG file to disk.")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    /// The folder or file the failed operation targeted.
    pub fn path(&self) -> &Path {
        match self {
            Self::CannotCreateFolder { path, .. } | Self::WriteFailed { path, .. } => path,
        }
    }
}

/// Filesystem storage rooted at a fixed base directory.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// The root is not touched until the first job folder is requested.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create (or reuse) the folder for job `name` and return its path.
    ///
    /// Idempotent: calling twice with the same name returns the same path.
    /// `name` must be a single plain path component.
    pub fn make_job_folder(&self, name: &str) -> Result<PathBuf, StorageError> {
        let folder = self.root.join(name);
        if !is_plain_component(name) {
            return Err(StorageError::CannotCreateFolder {
                path: folder,
                source: io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("invalid job folder name {name:?}"),
                ),
            });
        }

        std::fs::create_dir_all(&folder).map_err(|source| StorageError::CannotCreateFolder {
            path: folder.clone(),
            source,
        })?;
        debug!(folder = %folder.display(), "job folder ready");
        Ok(folder)
    }

    /// Write `bytes` to `target` so that no reader ever sees a partial file.
    pub fn write_atomic(&self, bytes: &[u8], target: &Path) -> Result<(), StorageError> {
        let write_failed = |source: io::Error| StorageError::WriteFailed {
            path: target.to_path_buf(),
            source,
        };

        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = tempfile::Builder::new()
            .prefix(".pixbatch-")
            .suffix(".part")
            .tempfile_in(dir)
            .map_err(write_failed)?;
        temp.write_all(bytes).map_err(write_failed)?;
        temp.as_file().sync_all().map_err(write_failed)?;
        temp.persist(target).map_err(|e| write_failed(e.error))?;

        debug!(path = %target.display(), bytes = bytes.len(), "wrote file");
        Ok(())
    }
}

fn is_plain_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}
