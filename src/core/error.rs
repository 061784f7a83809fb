//! Error types for scheduler operations.

use thiserror::Error;

use crate::core::job::JobId;

/// Errors produced by scheduler entry points.
///
/// Failures inside a job's unit of work are not represented here: they are
/// isolated to that job and surface as its `Failed` terminal state.
/// Cancelling an unknown or already-finished id is a defined no-op, not an
/// error. Admission-gate accounting violations are programmer errors and
/// assert fatally instead of returning.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A job with this id is already queued or running.
    #[error("job {0} is already queued or running")]
    DuplicateJob(JobId),
    /// The scheduler has been shut down and accepts no further work.
    #[error("scheduler is shut down")]
    ShutDown,
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
