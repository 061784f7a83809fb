//! Cooperative cancellation tokens.
//!
//! A token is handed to `submit` alongside the unit of work and kept in the
//! registry so `cancel(id)` can reach the job. Cancellation is cooperative:
//! requesting it sets a flag and wakes anyone parked in
//! [`CancelToken::cancelled`]; the scheduler races that wakeup against the
//! job's own progress rather than forcibly aborting the task.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Lifecycle of a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CancelState {
    /// No cancellation requested.
    Unset,
    /// Cancellation requested, not yet acted upon.
    Requested,
    /// The runtime or the unit of work has seen the request.
    Observed,
}

const UNSET: u8 = 0;
const REQUESTED: u8 = 1;
const OBSERVED: u8 = 2;

struct CancelInner {
    state: AtomicU8,
    notify: Notify,
}

/// Shared cancel signal for one job. Clones observe the same state.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl CancelToken {
    /// Fresh, unset token.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancelInner {
                state: AtomicU8::new(UNSET),
                notify: Notify::new(),
            }),
        }
    }

    /// Request cancellation.
    ///
    /// Returns `true` only for the call that performed the
    /// `Unset -> Requested` transition, so concurrent callers set the
    /// signal exactly once. Requesting an already finished job's token is
    /// harmless.
    pub fn request(&self) -> bool {
        let won = self
            .inner
            .state
            .compare_exchange(UNSET, REQUESTED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.inner.notify.notify_waiters();
        }
        won
    }

    /// Mark the request as seen (`Requested -> Observed`).
    pub fn acknowledge(&self) {
        let _ = self.inner.state.compare_exchange(
            REQUESTED,
            OBSERVED,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Whether cancellation has been requested (observed or not).
    pub fn is_requested(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) != UNSET
    }

    /// Current tri-state value.
    pub fn state(&self) -> CancelState {
        match self.inner.state.load(Ordering::Acquire) {
            UNSET => CancelState::Unset,
            REQUESTED => CancelState::Requested,
            _ => CancelState::Observed,
        }
    }

    /// Suspend until cancellation is requested.
    ///
    /// Returns immediately if it already was. Safe to call from any number
    /// of clones concurrently.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_requested() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
