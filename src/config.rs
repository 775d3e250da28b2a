//! Pipeline configuration module.
//!
//! Handles loading and validating `pixbatch.toml`. Stock defaults are the base
//! layer; a user file overrides only the keys it names.
//!
//! ## Config File Location
//!
//! ```text
//! <config dir>/               # --config-dir, default "."
//! └── pixbatch.toml           # optional; absent means stock defaults
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [limits]
//! concurrency = 2        # Jobs allowed inside the transform at once
//! max_batch = 10         # Inputs beyond this are ignored
//!
//! [targets]
//! medium = 1024          # Longest edge of small.jpg, in pixels
//! thumbnail = 256        # Longest edge of thumb.jpg, in pixels
//!
//! [encoding]
//! quality = 0.9          # JPEG quality, 0.0-1.0
//!
//! [storage]
//! # root = "/srv/processed"   # Default: <system temp>/Processed
//!
//! [processing]
//! # workers = 10         # Worker threads (omit for max_batch)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse — override just the values you want:
//!
//! ```toml
//! [limits]
//! concurrency = 4
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Quality, TargetSize};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the config directory.
pub const CONFIG_FILE: &str = "pixbatch.toml";

/// Folder created under the system temp dir when no storage root is configured.
pub const DEFAULT_STORAGE_DIR: &str = "Processed";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Pipeline configuration loaded from `pixbatch.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Admission control and batch size.
    pub limits: LimitsConfig,
    /// Rendition sizes.
    pub targets: TargetsConfig,
    /// JPEG encoder settings.
    pub encoding: EncodingConfig,
    /// Where job folders are written.
    pub storage: StorageConfig,
    /// Worker pool settings.
    pub processing: ProcessingConfig,
}

impl PipelineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let quality = self.encoding.quality.value();
        if !(0.0..=1.0).contains(&quality) {
            return Err(ConfigError::Validation(
                "encoding.quality must be 0.0-1.0".into(),
            ));
        }
        if self.targets.medium == 0 || self.targets.thumbnail == 0 {
            return Err(ConfigError::Validation(
                "targets.medium and targets.thumbnail must be non-zero".into(),
            ));
        }
        if self.limits.max_batch == 0 {
            return Err(ConfigError::Validation(
                "limits.max_batch must be non-zero".into(),
            ));
        }
        if self.processing.workers == Some(0) {
            return Err(ConfigError::Validation(
                "processing.workers must be non-zero when set".into(),
            ));
        }
        Ok(())
    }

    pub fn medium_target(&self) -> TargetSize {
        TargetSize {
            label: "medium",
            max_dimension: self.targets.medium,
        }
    }

    pub fn thumbnail_target(&self) -> TargetSize {
        TargetSize {
            label: "thumbnail",
            max_dimension: self.targets.thumbnail,
        }
    }

    /// Configured storage root, or `<system temp>/Processed`.
    pub fn storage_root(&self) -> PathBuf {
        self.storage
            .root
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_STORAGE_DIR))
    }
}

/// Admission control settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Jobs allowed to run their pipeline at the same time. Values below 1 act as 1.
    pub concurrency: usize,
    /// Largest batch accepted; extra inputs are dropped with a warning.
    pub max_batch: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            max_batch: 10,
        }
    }
}

/// Longest-edge limits of the two renditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetsConfig {
    pub medium: u32,
    pub thumbnail: u32,
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            medium: 1024,
            thumbnail: 256,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingConfig {
    pub quality: Quality,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Base directory for job folders. When absent, `<system temp>/Processed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

/// Worker pool settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Worker threads in the orchestrator's pool.
    /// When absent, equals `limits.max_batch` so a full batch starts at once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
}

/// Resolve the worker pool size.
///
/// - `None` → `max_batch`
/// - `Some(n)` → `n`, at least 1
pub fn effective_workers(config: &PipelineConfig) -> usize {
    config
        .processing
        .workers
        .unwrap_or(config.limits.max_batch)
        .max(1)
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(PipelineConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `pixbatch.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<PipelineConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PipelineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `pixbatch.toml` in the given directory.
pub fn load_config(dir: &Path) -> Result<PipelineConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `pixbatch.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# pixbatch Configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file in the directory passed as --config-dir (default: the
# current directory). Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Limits
# ---------------------------------------------------------------------------
[limits]
# How many jobs may decode, resize and encode at the same time. Every job of
# a batch starts together; the rest wait in arrival order for a free slot.
concurrency = 2

# Largest batch accepted. Inputs beyond this are ignored with a warning.
max_batch = 10

# ---------------------------------------------------------------------------
# Renditions
# ---------------------------------------------------------------------------
[targets]
# Longest edge in pixels. Images are never upscaled.
medium = 1024       # written as small.jpg
thumbnail = 256     # written as thumb.jpg

# ---------------------------------------------------------------------------
# Encoding
# ---------------------------------------------------------------------------
[encoding]
# JPEG quality from 0.0 (smallest) to 1.0 (best).
quality = 0.9

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Base directory for job folders. Each job gets <root>/<job id>/ holding
# original.jpg, small.jpg and thumb.jpg.
# Default: <system temp dir>/Processed
# root = "/srv/processed"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Worker threads. Omit to use max_batch so a full batch is launched at once;
# concurrency still bounds how many of them do pixel work.
# workers = 10
"##
}
