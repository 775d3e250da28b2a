//! Cooperative cancellation for batch tasks.
//!
//! A [`CancelToken`] is shared between the orchestrator and every task of one
//! batch. Tasks poll it while queued on the [`Limiter`](crate::limiter::Limiter)
//! and between pipeline steps; nothing is interrupted mid-step.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared, clonable cancellation flag. Once cancelled it stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
