//! Download job scheduler: FIFO-ordered dispatch, bounded execution,
//! cancellation by id.
//!
//! A `Scheduler` owns its pending queue, its registry of live jobs, and an
//! [`AdmissionGate`] bounding how many units of work run at once. A single
//! dispatch loop pops jobs in queue order and spawns one execution context
//! per job; the context queues on the gate, so draining the queue is
//! decoupled from concurrency throttling and any number of jobs may be
//! dispatched-but-gate-blocked at a time.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::config::SchedulerConfig;
use crate::core::cancel::CancelToken;
use crate::core::error::SchedulerError;
use crate::core::gate::AdmissionGate;
use crate::core::job::{JobFuture, JobId, JobState, Priority};
use crate::core::queue::{PendingJob, PendingQueue};
use crate::core::status::StatusSink;

/// Registry entry for a job that has been submitted and has not yet reached
/// a terminal state. The run handle appears when the job is dispatched.
struct RegistryEntry {
    cancel: CancelToken,
    handle: Option<JoinHandle<()>>,
}

struct SchedulerInner {
    gate: AdmissionGate,
    queue: Mutex<PendingQueue>,
    queue_ready: Notify,
    registry: Mutex<HashMap<JobId, RegistryEntry>>,
    sink: Arc<dyn StatusSink>,
    next_seq: AtomicU64,
    shutdown: AtomicBool,
}

impl SchedulerInner {
    /// Record a terminal transition and prune the registry entry.
    fn finish(&self, id: JobId, state: JobState) {
        self.registry.lock().remove(&id);
        match &state {
            JobState::Completed => tracing::info!(job_id = id, "job completed"),
            JobState::Failed(reason) => tracing::warn!(job_id = id, %reason, "job failed"),
            JobState::Cancelled => tracing::info!(job_id = id, "job cancelled"),
            _ => {}
        }
        self.sink.record(id, state);
    }
}

/// An explicitly constructed scheduler instance with its own lifecycle.
///
/// Construction spawns the dispatch loop on the current tokio runtime;
/// [`shutdown`](Scheduler::shutdown) stops it. Independent instances do not
/// share state, so tests can run several side by side.
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
    dispatch: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Create a scheduler admitting up to `limit` concurrent jobs,
    /// reporting state transitions to `sink`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(limit: usize, sink: Arc<dyn StatusSink>) -> Self {
        let inner = Arc::new(SchedulerInner {
            gate: AdmissionGate::new(limit),
            queue: Mutex::new(PendingQueue::new()),
            queue_ready: Notify::new(),
            registry: Mutex::new(HashMap::new()),
            sink,
            next_seq: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
        });
        let dispatch = tokio::spawn(dispatch_loop(Arc::clone(&inner)));
        tracing::info!(limit, "scheduler started");
        Self {
            inner,
            dispatch: Mutex::new(Some(dispatch)),
        }
    }

    /// Create a scheduler from validated configuration.
    pub fn from_config(config: &SchedulerConfig, sink: Arc<dyn StatusSink>) -> Self {
        Self::new(config.max_concurrent_downloads, sink)
    }

    /// Enqueue a new job at the tail of the pending queue.
    ///
    /// Returns immediately; admission happens later in the job's own
    /// execution context. The caller keeps a clone of `cancel` inside the
    /// unit of work if it wants to poll the signal itself.
    ///
    /// Fails with [`SchedulerError::DuplicateJob`] while a job with the
    /// same id is still queued or running, and with
    /// [`SchedulerError::ShutDown`] after shutdown.
    pub fn submit<F>(
        &self,
        id: JobId,
        work: F,
        cancel: CancelToken,
        priority: Priority,
    ) -> Result<(), SchedulerError>
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        if self.inner.shutdown.load(Ordering::Acquire) {
            return Err(SchedulerError::ShutDown);
        }

        {
            let mut registry = self.inner.registry.lock();
            if registry.contains_key(&id) {
                return Err(SchedulerError::DuplicateJob(id));
            }
            registry.insert(
                id,
                RegistryEntry {
                    cancel: cancel.clone(),
                    handle: None,
                },
            );
        }

        self.inner.sink.record(id, JobState::Queued);
        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
        self.inner.queue.lock().push(PendingJob {
            id,
            work: Box::pin(work) as JobFuture,
            cancel,
            priority,
            seq,
        });
        self.inner.queue_ready.notify_one();
        tracing::debug!(job_id = id, priority, seq, "job queued");
        Ok(())
    }

    /// Request cancellation of a queued or running job.
    ///
    /// Unknown ids and already-finished jobs are a silent no-op; a caller
    /// that needs to tell those apart consults the status collaborator.
    /// Safe to race with the job finishing: a request landing on a job
    /// that completes a moment later changes nothing.
    pub fn cancel(&self, id: JobId) {
        let token = self
            .inner
            .registry
            .lock()
            .get(&id)
            .map(|entry| entry.cancel.clone());
        match token {
            Some(token) => {
                if token.request() {
                    tracing::info!(job_id = id, "cancellation requested");
                }
            }
            None => {
                tracing::debug!(job_id = id, "cancel ignored: job unknown or finished");
            }
        }
    }

    /// Change the admission bound at runtime.
    ///
    /// Takes effect for future admissions only; in-flight jobs are never
    /// preempted when the bound drops below the current in-flight count.
    pub fn update_concurrency(&self, new_limit: usize) {
        self.inner.gate.update_limit(new_limit);
    }

    /// Current admission bound.
    pub fn concurrency_limit(&self) -> usize {
        self.inner.gate.limit()
    }

    /// Number of jobs waiting for dispatch.
    pub fn queued_len(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Whether a job id is currently queued or running.
    pub fn is_registered(&self, id: JobId) -> bool {
        self.inner.registry.lock().contains_key(&id)
    }

    /// Stop the scheduler.
    ///
    /// Refuses further submissions, stops the dispatch loop, marks every
    /// still-queued job `Cancelled`, requests cancellation of every running
    /// job, and waits for their execution contexts to wind down
    /// cooperatively. Idempotent.
    pub async fn shutdown(&self) {
        if self.inner.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::info!("scheduler shutting down");
        self.inner.queue_ready.notify_waiters();

        let dispatch = self.dispatch.lock().take();
        if let Some(handle) = dispatch {
            let _ = handle.await;
        }

        // Jobs never dispatched go straight to Cancelled.
        let drained = self.inner.queue.lock().drain();
        for job in drained {
            job.cancel.request();
            job.cancel.acknowledge();
            self.inner.finish(job.id, JobState::Cancelled);
        }

        // Running jobs stop at their next suspension point.
        let handles: Vec<_> = {
            let mut registry = self.inner.registry.lock();
            registry
                .values_mut()
                .map(|entry| {
                    entry.cancel.request();
                    entry.handle.take()
                })
                .collect()
        };
        for handle in handles.into_iter().flatten() {
            let _ = handle.await;
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // Without an explicit shutdown the dispatch loop would keep the
        // inner state alive forever; it holds no permits, so aborting it
        // at its wait point is safe.
        if let Some(handle) = self.dispatch.lock().take() {
            handle.abort();
        }
    }
}

/// Single consumer of the pending queue.
///
/// Pops jobs in queue order and hands each to its own execution context
/// without waiting on the admission gate, so dispatch of job N+1 is never
/// blocked by gate backpressure on job N.
async fn dispatch_loop(inner: Arc<SchedulerInner>) {
    loop {
        let notified = inner.queue_ready.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if inner.shutdown.load(Ordering::Acquire) {
            tracing::debug!("dispatch loop exiting");
            return;
        }

        let popped = { inner.queue.lock().pop() };
        let Some(job) = popped else {
            notified.await;
            continue;
        };

        // Cancelled while queued: never reaches Running, no gate work.
        if job.cancel.is_requested() {
            job.cancel.acknowledge();
            inner.finish(job.id, JobState::Cancelled);
            continue;
        }

        tracing::debug!(job_id = job.id, "dispatching job");
        inner.sink.record(job.id, JobState::Running);

        let ctx = Arc::clone(&inner);
        let id = job.id;
        let cancel = job.cancel.clone();
        let handle = tokio::spawn(run_job(ctx, id, job.work, cancel));

        // The job may already have finished and pruned its entry; only a
        // live entry gets the handle.
        if let Some(entry) = inner.registry.lock().get_mut(&id) {
            entry.handle = Some(handle);
        }
    }
}

/// Execution context for one dispatched job.
///
/// Races the cancel signal against gate admission and then against the unit
/// of work itself. The permit is scoped, so it returns to the gate on every
/// exit path including panic unwind inside the work.
async fn run_job(inner: Arc<SchedulerInner>, id: JobId, work: JobFuture, cancel: CancelToken) {
    let permit = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            cancel.acknowledge();
            inner.finish(id, JobState::Cancelled);
            return;
        }
        permit = inner.gate.acquire() => permit,
    };

    let outcome = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            cancel.acknowledge();
            JobState::Cancelled
        }
        result = AssertUnwindSafe(work).catch_unwind() => match result {
            Ok(Ok(())) => JobState::Completed,
            Ok(Err(err)) => JobState::Failed(format!("{err:#}")),
            Err(_) => JobState::Failed("unit of work panicked".into()),
        },
    };

    drop(permit);
    inner.finish(id, outcome);
}
