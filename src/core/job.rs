//! Job identity, priority, lifecycle states, and the opaque unit of work.

use std::future::Future;
use std::pin::Pin;

/// Externally assigned job identifier, matching the persistence
/// collaborator's numeric row ids.
pub type JobId = i64;

/// Scheduling priority hint. Higher values are dispatched first; jobs at
/// equal priority dispatch in submission order.
pub type Priority = i32;

/// Lifecycle of a scheduled job.
///
/// `Queued -> Running -> {Completed | Failed | Cancelled}`. The three
/// right-hand states are terminal; a job cancelled while still queued goes
/// straight from `Queued` to `Cancelled` without ever running.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum JobState {
    /// Waiting in the pending queue.
    Queued,
    /// Dispatched; may still be blocked on the admission gate.
    Running,
    /// Unit of work returned `Ok`.
    Completed,
    /// Unit of work returned an error or panicked; carries the reason.
    Failed(String),
    /// Cancel signal won before or during execution.
    Cancelled,
}

impl JobState {
    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Queued | Self::Running)
    }
}

/// The opaque asynchronous unit of work for one job.
///
/// The scheduler neither knows nor cares how it fetches data; it only runs
/// it under an admission permit and races it against the cancel signal.
pub type JobFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed("io".into()).is_terminal());
        assert!(JobState::Cancelled.is_terminal());
    }
}
