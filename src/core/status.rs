//! Status sink: how job state transitions leave the scheduler.
//!
//! The scheduler is not the system of record for job status; the
//! persistence collaborator is. Every transition (`Queued`, `Running`,
//! terminal) is pushed through this seam so the collaborator can update its
//! download table without polling scheduler internals.

use std::collections::HashMap;
use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::core::job::{JobId, JobState};
use crate::util::clock::now_ms;

/// One recorded transition.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StatusRecord {
    /// Job the transition belongs to.
    pub job_id: JobId,
    /// State entered.
    pub state: JobState,
    /// Timestamp milliseconds.
    pub recorded_at_ms: u128,
}

/// Receiver for job state transitions.
///
/// Implementations must be cheap and non-blocking; they are called from the
/// dispatch loop and from job execution contexts.
pub trait StatusSink: Send + Sync {
    /// Record that `job_id` entered `state`.
    fn record(&self, job_id: JobId, state: JobState);
}

/// In-memory sink for tests and development, bounded per job.
pub struct InMemoryStatusSink {
    records: Mutex<HashMap<JobId, VecDeque<StatusRecord>>>,
    max_per_job: usize,
}

impl InMemoryStatusSink {
    /// Create a sink keeping at most `max_per_job` records per job.
    pub fn new(max_per_job: usize) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            max_per_job,
        }
    }

    /// Most recent state recorded for a job, if any.
    pub fn latest(&self, job_id: JobId) -> Option<JobState> {
        self.records
            .lock()
            .get(&job_id)
            .and_then(|h| h.back())
            .map(|r| r.state.clone())
    }

    /// Full retained transition history for a job, oldest first.
    pub fn history(&self, job_id: JobId) -> Vec<StatusRecord> {
        self.records
            .lock()
            .get(&job_id)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl StatusSink for InMemoryStatusSink {
    fn record(&self, job_id: JobId, state: JobState) {
        let mut records = self.records.lock();
        let history = records.entry(job_id).or_default();
        if history.len() >= self.max_per_job {
            history.pop_front();
        }
        history.push_back(StatusRecord {
            job_id,
            state,
            recorded_at_ms: now_ms(),
        });
    }
}

/// Sink that discards every record, for callers that track status elsewhere.
pub struct NullStatusSink;

impl StatusSink for NullStatusSink {
    fn record(&self, _job_id: JobId, _state: JobState) {}
}
