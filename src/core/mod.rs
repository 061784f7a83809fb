//! Core scheduling components: admission gate, job model, scheduler.

pub mod cancel;
pub mod error;
pub mod gate;
pub mod job;
pub(crate) mod queue;
pub mod scheduler;
pub mod status;

pub use cancel::{CancelState, CancelToken};
pub use error::{AppResult, SchedulerError};
pub use gate::{AdmissionGate, AdmissionPermit};
pub use job::{JobFuture, JobId, JobState, Priority};
pub use scheduler::Scheduler;
pub use status::{InMemoryStatusSink, NullStatusSink, StatusRecord, StatusSink};
