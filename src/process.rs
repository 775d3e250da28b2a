//! Batch orchestration.
//!
//! The [`Orchestrator`] turns a batch of inputs into jobs, runs every job on
//! its worker pool under the shared [`Limiter`], and keeps the observable job
//! list up to date.
//!
//! ## Per-job pipeline
//!
//! ```text
//! acquire slot ─▶ Processing(None)
//!   load bytes
//!   transform @ medium      progress 0.0 ─ 0.5
//!   transform @ thumbnail   progress 0.5 ─ 1.0
//!   <root>/<job id>/original.jpg, small.jpg, thumb.jpg   (atomic writes)
//! ─▶ Success(result) | Failure(message) ─▶ release slot
//! ```
//!
//! A failure at any step ends that job only. Its siblings keep running.
//!
//! ## Fan-out / fan-in
//!
//! Tasks never touch the job list. Each one owns a channel `Sender` and sends
//! [`JobUpdate`]s; the thread that called [`Orchestrator::process_batch`]
//! drains the channel and is the only writer of job state. Every update is
//! checked with [`JobStatus::accepts`] before it is applied, so progress never
//! moves backwards and terminal states stay terminal. The batch is finished
//! when the channel closes, which happens only after every task has sent its
//! terminal status and dropped its sender.
//!
//! ## Generations
//!
//! Every batch start and every [`reset`](Orchestrator::reset) bumps the
//! generation. Reset cancels the [`CancelToken`] of every batch still
//! running; tasks stop at their next checkpoint and release their slots. Updates that arrive for
//! an older generation still complete that batch's own [`BatchReport`] but are
//! never applied to the shared job list or published.

use crate::cancel::CancelToken;
use crate::config::{PipelineConfig, effective_workers};
use crate::imaging::{ImageBackend, RustBackend, TransformError, transform};
use crate::limiter::Limiter;
use crate::source::{ImageSource, InputError};
use crate::storage::{Storage, StorageError};
use crate::types::{Job, JobId, JobStatus, ProcessedResult};
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

pub const ORIGINAL_FILE: &str = "original.jpg";
pub const MEDIUM_FILE: &str = "small.jpg";
pub const THUMBNAIL_FILE: &str = "thumb.jpg";

/// Errors that prevent an orchestrator from being built.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Why a single job failed. The `Display` text becomes the job's failure message.
#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Processing was cancelled.")]
    Cancelled,
    #[error("Processing failed unexpectedly.")]
    Panicked { detail: String },
}

/// Status change sent from a task to the fan-in loop.
#[derive(Debug, Clone, PartialEq)]
pub struct JobUpdate {
    pub index: usize,
    pub status: JobStatus,
}

/// Notification for observers. Every event carries the batch generation.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    BatchStarted {
        generation: u64,
        labels: Vec<String>,
    },
    StatusChanged {
        generation: u64,
        index: usize,
        label: String,
        status: JobStatus,
    },
    BatchFinished {
        generation: u64,
        succeeded: usize,
        failed: usize,
    },
    Reset {
        generation: u64,
    },
}

/// Final state of one batch as seen by its own fan-in loop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub generation: u64,
    /// A reset cancelled this batch before it finished.
    pub cancelled: bool,
    pub jobs: Vec<Job>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.jobs
            .iter()
            .filter(|j| matches!(j.status, JobStatus::Success(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.jobs
            .iter()
            .filter(|j| matches!(j.status, JobStatus::Failure(_)))
            .count()
    }
}

#[derive(Debug, Default)]
struct Board {
    generation: u64,
    jobs: Vec<Job>,
    /// Tokens of batches that have started and not yet finished, by generation.
    running: Vec<(u64, CancelToken)>,
}

/// Owns the job list and runs batches.
pub struct Orchestrator<B: ImageBackend = RustBackend> {
    config: PipelineConfig,
    backend: B,
    limiter: Limiter,
    storage: Storage,
    pool: rayon::ThreadPool,
    board: Mutex<Board>,
    selection: Mutex<Vec<Arc<dyn ImageSource>>>,
    subscribers: Mutex<Vec<Sender<ProcessEvent>>>,
}

impl Orchestrator {
    /// Orchestrator using the `image`-crate backend.
    pub fn new(config: PipelineConfig) -> Result<Self, ProcessError> {
        Self::with_backend(config, RustBackend::new())
    }
}

impl<B: ImageBackend> Orchestrator<B> {
    pub fn with_backend(config: PipelineConfig, backend: B) -> Result<Self, ProcessError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(effective_workers(&config))
            .thread_name(|i| format!("pixbatch-worker-{i}"))
            .build()?;
        Ok(Self {
            limiter: Limiter::new(config.limits.concurrency),
            storage: Storage::new(config.storage_root()),
            config,
            backend,
            pool,
            board: Mutex::new(Board::default()),
            selection: Mutex::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn limiter(&self) -> &Limiter {
        &self.limiter
    }

    /// Snapshot of the current job list.
    pub fn jobs(&self) -> Vec<Job> {
        self.board().jobs.clone()
    }

    pub fn generation(&self) -> u64 {
        self.board().generation
    }

    /// Receive every event published from now on.
    ///
    /// Publishing never blocks; a dropped receiver is forgotten.
    pub fn subscribe(&self) -> Receiver<ProcessEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers().push(tx);
        rx
    }

    /// Stage inputs for [`start`](Self::start), replacing any earlier selection.
    pub fn select(&self, inputs: Vec<Arc<dyn ImageSource>>) {
        *self.selection() = inputs;
    }

    pub fn selection_len(&self) -> usize {
        self.selection().len()
    }

    /// Process the staged selection. Does nothing when it is empty.
    pub fn start(&self) -> Option<BatchReport> {
        let inputs = std::mem::take(&mut *self.selection());
        if inputs.is_empty() {
            debug!("start with empty selection");
            return None;
        }
        Some(self.process_batch(inputs))
    }

    /// Cancel every running batch, clear the job list and the selection.
    pub fn reset(&self) {
        let mut board = self.board();
        for (_, cancel) in board.running.drain(..) {
            cancel.cancel();
        }
        board.generation += 1;
        board.jobs.clear();
        let generation = board.generation;
        self.selection().clear();
        info!(generation, "reset");
        self.publish(ProcessEvent::Reset { generation });
    }

    /// Run one batch to completion and return its report.
    ///
    /// Inputs beyond `limits.max_batch` are ignored. Returns only after every
    /// job has reached a terminal state.
    pub fn process_batch(&self, mut inputs: Vec<Arc<dyn ImageSource>>) -> BatchReport {
        let max_batch = self.config.limits.max_batch;
        if inputs.len() > max_batch {
            warn!(
                received = inputs.len(),
                max_batch, "batch too large, ignoring extra inputs"
            );
            inputs.truncate(max_batch);
        }

        let mut jobs: Vec<Job> = inputs.iter().map(|source| Job::new(source.label())).collect();
        let (generation, cancel) = self.begin_batch(&jobs);
        info!(generation, jobs = jobs.len(), "batch started");

        let (tx, rx) = mpsc::channel::<JobUpdate>();
        self.pool.in_place_scope(|scope| {
            for (index, (job, source)) in jobs.iter().zip(&inputs).enumerate() {
                let tx = tx.clone();
                let cancel = cancel.clone();
                let id = job.id;
                let source = Arc::clone(source);
                scope.spawn(move |_| self.run_job(index, id, source.as_ref(), &cancel, &tx));
            }
            drop(tx);

            for update in rx {
                self.apply(generation, &mut jobs, update);
            }
        });

        self.board().running.retain(|(g, _)| *g != generation);
        let report = BatchReport {
            generation,
            cancelled: cancel.is_cancelled(),
            jobs,
        };
        let (succeeded, failed) = (report.succeeded(), report.failed());
        info!(
            generation,
            succeeded,
            failed,
            cancelled = report.cancelled,
            "batch finished"
        );
        self.publish(ProcessEvent::BatchFinished {
            generation,
            succeeded,
            failed,
        });
        report
    }

    fn begin_batch(&self, jobs: &[Job]) -> (u64, CancelToken) {
        let mut board = self.board();
        board.generation += 1;
        board.jobs = jobs.to_vec();
        let generation = board.generation;
        let cancel = CancelToken::new();
        board.running.push((generation, cancel.clone()));
        self.publish(ProcessEvent::BatchStarted {
            generation,
            labels: jobs.iter().map(|j| j.label.clone()).collect(),
        });
        (generation, cancel)
    }

    /// Apply one update. Runs only on the fan-in thread.
    fn apply(&self, generation: u64, jobs: &mut [Job], update: JobUpdate) {
        let JobUpdate { index, status } = update;
        let Some(job) = jobs.get_mut(index) else {
            return;
        };
        if !job.status.accepts(&status) {
            debug!(index, from = ?job.status, to = ?status, "rejected status update");
            return;
        }
        job.status = status.clone();

        // Board and publish under one lock so a reset cannot slip between them.
        let mut board = self.board();
        if board.generation != generation {
            debug!(index, generation, "discarding stale update");
            return;
        }
        if let Some(shared) = board.jobs.get_mut(index) {
            shared.status = status.clone();
        }
        self.publish(ProcessEvent::StatusChanged {
            generation,
            index,
            label: job.label.clone(),
            status,
        });
    }

    fn run_job(
        &self,
        index: usize,
        id: JobId,
        source: &dyn ImageSource,
        cancel: &CancelToken,
        updates: &Sender<JobUpdate>,
    ) {
        let label = source.label();
        let span = info_span!("job", index, %id, %label);
        let _enter = span.enter();

        // The fan-in loop outlives every task, so a send can only fail after a panic there.
        let send = |status: JobStatus| {
            let _ = updates.send(JobUpdate { index, status });
        };

        let Some(permit) = self.limiter.acquire_cancellable(cancel) else {
            debug!("cancelled while queued");
            send(JobStatus::Failure(JobError::Cancelled.to_string()));
            return;
        };
        send(JobStatus::Processing { progress: None });

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.execute(id, source, cancel, &send)
        }))
        .unwrap_or_else(|payload| {
            Err(JobError::Panicked {
                detail: panic_detail(payload.as_ref()),
            })
        });
        let status = match outcome {
            Ok(result) => {
                info!(folder = %id, "job succeeded");
                JobStatus::Success(result)
            }
            Err(err) => {
                warn!(error = %err, detail = ?err, "job failed");
                JobStatus::Failure(err.to_string())
            }
        };
        send(status);
        permit.release();
    }

    fn execute(
        &self,
        id: JobId,
        source: &dyn ImageSource,
        cancel: &CancelToken,
        report: &impl Fn(JobStatus),
    ) -> Result<ProcessedResult, JobError> {
        let input = source.load()?;
        debug!(bytes = input.len(), "loaded input");
        ensure_live(cancel)?;

        let quality = self.config.encoding.quality;
        let medium = self.config.medium_target();
        let medium_jpeg = transform(
            &self.backend,
            &input,
            medium.max_dimension,
            quality,
            |p| {
                report(JobStatus::Processing {
                    progress: Some(p * 0.5),
                })
            },
        )?;
        debug!(rendition = medium.label, bytes = medium_jpeg.len(), "rendition encoded");
        ensure_live(cancel)?;

        let thumbnail = self.config.thumbnail_target();
        let thumbnail_jpeg = transform(
            &self.backend,
            &input,
            thumbnail.max_dimension,
            quality,
            |p| {
                report(JobStatus::Processing {
                    progress: Some(0.5 + p * 0.5),
                })
            },
        )?;
        debug!(
            rendition = thumbnail.label,
            bytes = thumbnail_jpeg.len(),
            "rendition encoded"
        );
        // Last checkpoint: once writing starts the folder is completed.
        ensure_live(cancel)?;

        let folder = self.storage.make_job_folder(&id.to_string())?;
        let result = ProcessedResult {
            original: folder.join(ORIGINAL_FILE),
            medium: folder.join(MEDIUM_FILE),
            thumbnail: folder.join(THUMBNAIL_FILE),
        };
        self.storage.write_atomic(&input, &result.original)?;
        self.storage.write_atomic(&medium_jpeg, &result.medium)?;
        self.storage.write_atomic(&thumbnail_jpeg, &result.thumbnail)?;
        Ok(result)
    }

    fn publish(&self, event: ProcessEvent) {
        self.subscribers()
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    fn board(&self) -> MutexGuard<'_, Board> {
        self.board.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn selection(&self) -> MutexGuard<'_, Vec<Arc<dyn ImageSource>>> {
        self.selection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribers(&self) -> MutexGuard<'_, Vec<Sender<ProcessEvent>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn ensure_live(cancel: &CancelToken) -> Result<(), JobError> {
    if cancel.is_cancelled() {
        Err(JobError::Cancelled)
    } else {
        Ok(())
    }
}
