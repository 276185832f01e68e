//! Trailing-edge debounce scheduling
//!
//! A [`Debouncer`] holds at most one pending job. Scheduling while a job is
//! pending replaces it and restarts the window, so a burst of calls produces a
//! single firing once the caller goes idle.

use std::time::{Duration, Instant};

/// Pending job state
#[derive(Debug)]
struct Pending<T> {
    /// When the job becomes due
    due_at: Instant,

    /// Payload handed back when the job fires
    payload: T,
}

/// Trailing debounce with a single pending slot
#[derive(Debug)]
pub struct Debouncer<T> {
    /// Quiet period required after the most recent `schedule` call
    delay: Duration,

    /// The one pending job, if any
    pending: Option<Pending<T>>,
}

impl<T> Debouncer<T> {
    /// Create a debouncer with the given quiet period
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    /// Get the quiet period
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule a job, cancelling and replacing any pending one
    ///
    /// The job becomes due `delay` after `now`.
    pub fn schedule(&mut self, now: Instant, payload: T) {
        self.pending = Some(Pending { due_at: now + self.delay, payload });
    }

    /// Cancel the pending job, returning its payload
    pub fn cancel_pending(&mut self) -> Option<T> {
        self.pending.take().map(|pending| pending.payload)
    }

    /// Check whether a job is waiting to fire
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending job becomes due
    ///
    /// Hosts use this to arm their event-loop timer.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.due_at)
    }

    /// Take the pending job if it is due at `now`
    ///
    /// Returns `None` when nothing is pending or the window is still open.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some(pending) if now >= pending.due_at => self.cancel_pending(),
            _ => None,
        }
    }

    /// Take the pending job regardless of its deadline
    pub fn fire_now(&mut self) -> Option<T> {
        self.cancel_pending()
    }
}
