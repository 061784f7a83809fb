//! Admission gate: an adjustable counting semaphore.
//!
//! Bounds how many download jobs may run at once. Unlike a fixed semaphore
//! the bound can be raised or lowered while jobs are waiting or running,
//! which is how a settings change takes effect without restarting the
//! scheduler. Lowering the bound never preempts permit holders; the gate
//! simply stops admitting until enough permits drain back.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Counter state guarded by the gate mutex.
///
/// Invariant: a waiter may not proceed until `inflight < limit`; `inflight`
/// therefore never exceeds `limit` at the instant a permit is granted.
struct GateState {
    limit: usize,
    inflight: usize,
}

struct GateInner {
    state: Mutex<GateState>,
    notify: Notify,
}

/// Adjustable concurrency limiter shared between the dispatch loop and
/// every job's execution context. Clones observe the same gate.
///
/// Both wake paths (`release` via permit drop, and [`update_limit`]) wake
/// *all* waiters rather than one: a single freed slot can race with a limit
/// change, and a raised limit can satisfy many waiters at once. A woken
/// waiter that still finds the gate full simply re-registers and waits
/// again.
///
/// [`update_limit`]: AdmissionGate::update_limit
#[derive(Clone)]
pub struct AdmissionGate {
    inner: Arc<GateInner>,
}

impl AdmissionGate {
    /// Create a gate admitting up to `limit` concurrent holders.
    ///
    /// A limit of zero is valid: the gate admits nobody until
    /// [`update_limit`](Self::update_limit) raises it.
    pub fn new(limit: usize) -> Self {
        Self {
            inner: Arc::new(GateInner {
                state: Mutex::new(GateState { limit, inflight: 0 }),
                notify: Notify::new(),
            }),
        }
    }

    /// Wait until a slot is free, then take it.
    ///
    /// The returned permit releases the slot when dropped, on every exit
    /// path including panic unwind, so release without a matching acquire
    /// is unrepresentable.
    pub async fn acquire(&self) -> AdmissionPermit {
        loop {
            // Register interest before checking so a wake landing between
            // the check and the await is not lost.
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.inner.state.lock();
                if state.inflight < state.limit {
                    state.inflight += 1;
                    return AdmissionPermit { gate: self.clone() };
                }
            }

            notified.await;
        }
    }

    /// Replace the concurrency bound and wake every waiter.
    ///
    /// The new bound applies to future admissions only: if it is below the
    /// current in-flight count, running holders are left alone and the gate
    /// stays closed until completions bring `inflight` back under it.
    pub fn update_limit(&self, new_limit: usize) {
        {
            let mut state = self.inner.state.lock();
            tracing::info!(
                old_limit = state.limit,
                new_limit,
                inflight = state.inflight,
                "updating admission gate limit"
            );
            state.limit = new_limit;
        }
        self.inner.notify.notify_waiters();
    }

    /// Current concurrency bound.
    pub fn limit(&self) -> usize {
        self.inner.state.lock().limit
    }

    /// Number of permits currently held.
    pub fn inflight(&self) -> usize {
        self.inner.state.lock().inflight
    }

    /// Return a permit. Only reachable through [`AdmissionPermit`]'s drop.
    fn release(&self) {
        {
            let mut state = self.inner.state.lock();
            assert!(
                state.inflight > 0,
                "admission gate released more permits than it granted"
            );
            state.inflight -= 1;
        }
        self.inner.notify.notify_waiters();
    }
}

/// RAII handle for one admission slot.
pub struct AdmissionPermit {
    gate: AdmissionGate,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.gate.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn grants_up_to_limit_without_waiting() {
        let gate = AdmissionGate::new(3);
        let _a = gate.acquire().await;
        let _b = gate.acquire().await;
        let _c = gate.acquire().await;
        assert_eq!(gate.inflight(), 3);
    }

    #[tokio::test]
    async fn drop_releases_slot() {
        let gate = AdmissionGate::new(1);
        let permit = gate.acquire().await;
        assert_eq!(gate.inflight(), 1);
        drop(permit);
        assert_eq!(gate.inflight(), 0);
        let _again = gate.acquire().await;
        assert_eq!(gate.inflight(), 1);
    }

    #[tokio::test]
    async fn inflight_never_exceeds_limit() {
        let gate = AdmissionGate::new(2);
        let peak = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let gate = gate.clone();
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let _permit = gate.acquire().await;
                peak.fetch_max(gate.inflight(), Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(gate.inflight(), 0);
    }

    #[tokio::test]
    async fn raising_limit_wakes_all_satisfiable_waiters() {
        let gate = AdmissionGate::new(0);
        let admitted = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let gate = gate.clone();
            let admitted = Arc::clone(&admitted);
            handles.push(tokio::spawn(async move {
                let _permit = gate.acquire().await;
                admitted.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
            }));
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(admitted.load(Ordering::SeqCst), 0);

        gate.update_limit(4);
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(admitted.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn lowering_limit_does_not_evict_holders() {
        let gate = AdmissionGate::new(2);
        let a = gate.acquire().await;
        let b = gate.acquire().await;

        gate.update_limit(1);
        assert_eq!(gate.inflight(), 2);
        assert_eq!(gate.limit(), 1);

        // Releasing one permit is not enough to admit anybody new.
        drop(a);
        let gate2 = gate.clone();
        let waiter = tokio::spawn(async move {
            let _p = gate2.acquire().await;
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        drop(b);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn permit_released_on_panic() {
        let gate = AdmissionGate::new(1);
        let gate2 = gate.clone();
        let handle = tokio::spawn(async move {
            let _permit = gate2.acquire().await;
            panic!("boom");
        });
        assert!(handle.await.is_err());
        assert_eq!(gate.inflight(), 0);
    }
}
