//! Job data model shared by the orchestrator, the event stream and the CLI.
//!
//! A [`Job`] is created `Idle` at batch start and moves through
//! [`JobStatus`] until it reaches a terminal state:
//!
//! ```text
//! Idle ──▶ Processing(None) ──▶ Processing(Some(p)) ──▶ Success(result)
//!                    │                   │
//!                    └───────────────────┴──────────────▶ Failure(message)
//! ```
//!
//! Terminal states absorb every later update, and progress never moves
//! backwards. [`JobStatus::accepts`] encodes both rules; the orchestrator
//! consults it before applying any update.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Opaque, globally unique job identity. Also names the job's output folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Output locations of one successful job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedResult {
    /// Unmodified copy of the input bytes
    pub original: PathBuf,
    /// Medium rendition
    pub medium: PathBuf,
    pub thumbnail: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Idle,
    Processing { progress: Option<f64> },
    Success(ProcessedResult),
    Failure(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success(_) | Self::Failure(_))
    }

    /// Reported progress, if the job is processing and has reported any.
    pub fn progress(&self) -> Option<f64> {
        match self {
            Self::Processing { progress } => *progress,
            _ => None,
        }
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn accepts(&self, next: &JobStatus) -> bool {
        match (self, next) {
            (current, _) if current.is_terminal() => false,
            (_, Self::Idle) => false,
            (
                Self::Processing {
                    progress: Some(current),
                },
                Self::Processing {
                    progress: Some(new),
                },
            ) => new >= current,
            // An unknown progress after a known one would hide what observers already saw.
            (Self::Processing { progress: Some(_) }, Self::Processing { progress: None }) => false,
            _ => true,
        }
    }
}

/// One image's processing unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Label of the input this job was created from
    pub label: String,
    pub status: JobStatus,
}

impl Job {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            label: label.into(),
            status: JobStatus::Idle,
        }
    }
}
