//! FIFO admission control for concurrent jobs.
//!
//! The [`Limiter`] bounds how many callers may hold a slot at once. Callers
//! that arrive while every slot is taken are queued with a ticket and resumed
//! strictly in arrival order.
//!
//! ## Hand-off
//!
//! Releasing a slot while callers are queued does not decrement the count.
//! The slot is handed directly to the oldest ticket, so a newcomer can never
//! overtake a waiter between the release and the waiter waking up:
//!
//! ```text
//! limit = 1
//! A acquire  → admitted         in_flight = 1
//! B acquire  → queued [B]       in_flight = 1
//! C acquire  → queued [B, C]    in_flight = 1
//! A release  → hand-off to B    in_flight = 1, queue [C]
//! B release  → hand-off to C    in_flight = 1, queue []
//! C release  → slot freed       in_flight = 0
//! ```
//!
//! A slot is held by a [`Permit`]. Dropping the permit releases the slot, so
//! every successful acquire is paired with exactly one release, including on
//! early returns and panics.

use crate::cancel::CancelToken;
use std::collections::{HashSet, VecDeque};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// How often a cancellable waiter re-checks its token.
const CANCEL_POLL: Duration = Duration::from_millis(20);

#[derive(Debug, Default)]
struct LimiterState {
    in_flight: usize,
    next_ticket: u64,
    queue: VecDeque<u64>,
    /// Tickets that received a slot from `release` but have not woken yet.
    handed_off: HashSet<u64>,
}

impl LimiterState {
    fn enqueue(&mut self) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.queue.push_back(ticket);
        ticket
    }
}

/// Counting limiter with FIFO wake-up order.
#[derive(Debug)]
pub struct Limiter {
    limit: usize,
    state: Mutex<LimiterState>,
    wakeup: Condvar,
}

impl Limiter {
    /// Create a limiter admitting at most `limit` holders (values below 1 become 1).
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            state: Mutex::new(LimiterState::default()),
            wakeup: Condvar::new(),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of slots currently held.
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Number of callers queued for a slot.
    pub fn waiting(&self) -> usize {
        self.lock().queue.len()
    }

    /// Block until a slot is available and return the permit holding it.
    pub fn acquire(&self) -> Permit<'_> {
        let mut state = self.lock();
        if state.in_flight < self.limit && state.queue.is_empty() {
            state.in_flight += 1;
            return Permit { limiter: self };
        }

        let ticket = state.enqueue();
        while !state.handed_off.remove(&ticket) {
            state = self
                .wakeup
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        Permit { limiter: self }
    }

    /// Like [`acquire`](Self::acquire), but give up once `cancel` fires.
    ///
    /// Returns `None` if the token was cancelled before admission; the caller
    /// then holds nothing and must not release. A slot handed off in the same
    /// instant as the cancellation is still returned as a permit.
    pub fn acquire_cancellable(&self, cancel: &CancelToken) -> Option<Permit<'_>> {
        let mut state = self.lock();
        if cancel.is_cancelled() {
            return None;
        }
        if state.in_flight < self.limit && state.queue.is_empty() {
            state.in_flight += 1;
            return Some(Permit { limiter: self });
        }

        let ticket = state.enqueue();
        loop {
            if state.handed_off.remove(&ticket) {
                return Some(Permit { limiter: self });
            }
            if cancel.is_cancelled() {
                state.queue.retain(|queued| *queued != ticket);
                return None;
            }
            let (guard, _) = self
                .wakeup
                .wait_timeout(state, CANCEL_POLL)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }

    fn release(&self) {
        let mut state = self.lock();
        match state.queue.pop_front() {
            Some(next) => {
                state.handed_off.insert(next);
                drop(state);
                // Waiters share one condvar; each checks its own ticket.
                self.wakeup.notify_all();
            }
            None => state.in_flight = state.in_flight.saturating_sub(1),
        }
    }

    // No critical section can panic halfway through an update, so a
    // poisoned lock still guards consistent state.
    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A held slot. Released on drop.
#[must_use = "dropping a permit releases the slot immediately"]
#[derive(Debug)]
pub struct Permit<'a> {
    limiter: &'a Limiter,
}

impl Permit<'_> {
    /// Release the slot now. Equivalent to dropping the permit.
    pub fn release(self) {}
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.limiter.release();
    }
}
