//! # pixbatch
//!
//! Batch image processing under a concurrency cap. Every input becomes a job
//! that produces three files: an untouched copy of the original, a medium
//! rendition and a thumbnail, written atomically into a folder named by the
//! job's id.
//!
//! # Architecture
//!
//! ```text
//! inputs ─▶ Orchestrator ─┬─▶ task 1 ─┐
//!            (job list)   ├─▶ task 2 ─┼─▶ Limiter ─▶ transform ×2 ─▶ Storage
//!                ▲        └─▶ task N ─┘
//!                └──────── JobUpdate channel (fan-in) ◀────────────────┘
//! ```
//!
//! Every task of a batch is launched at once on the orchestrator's worker
//! pool; the [`limiter`] decides how many of them do pixel work at a time.
//! Tasks report through a channel and the calling thread applies their
//! updates, so the job list has exactly one writer.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`process`] | Orchestrator: job list, fan-out/fan-in, events, reset |
//! | [`limiter`] | FIFO counting limiter with RAII permits |
//! | [`cancel`] | Shared cancellation flag for one batch |
//! | [`imaging`] | Decode → resize → encode with progress checkpoints |
//! | [`storage`] | Per-job folders and atomic writes |
//! | [`source`] | Input byte providers (files, memory) |
//! | [`types`] | `Job`, `JobStatus`, `ProcessedResult` |
//! | [`config`] | `pixbatch.toml` loading and validation |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`output`] | CLI formatting of events and reports |
//!
//! # Design Decisions
//!
//! ## Blocking Threads, Not Async
//!
//! All work is CPU-bound decoding and encoding plus a few local file writes.
//! A rayon pool with blocking waits on a `Condvar` keeps the control flow
//! linear and the dependency stack small.
//!
//! ## Failures Stay Inside Their Job
//!
//! Every error a task can hit is converted to that job's `Failure` message at
//! the task boundary. Only configuration and worker-pool construction errors
//! reach the caller, and both happen before a batch starts.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate for decoding, Lanczos3
//! resampling and JPEG encoding. No system libraries are required.

pub mod cancel;
pub mod config;
pub mod imaging;
pub mod limiter;
pub mod logging;
pub mod output;
pub mod process;
pub mod source;
pub mod storage;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
