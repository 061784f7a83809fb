//! # Downpool
//!
//! An adjustable-concurrency scheduler for long-running download jobs.
//!
//! Downpool runs a bounded number of opaque asynchronous units of work at
//! once, lets the bound be changed at runtime without restarting in-flight
//! work, and lets any queued or running job be cancelled by id.
//!
//! ## Core pieces
//!
//! - **Admission gate**: a counting semaphore whose limit can be raised or
//!   lowered while jobs are waiting or running. Lowering the limit never
//!   preempts running jobs; the gate just stops admitting new ones until
//!   enough complete.
//! - **Scheduler**: a pending queue (stable priority order, FIFO within a
//!   priority level), a single dispatch loop, a registry mapping job id to
//!   its run handle and cancel token, and best-effort cooperative
//!   cancellation.
//! - **Status sink**: a seam through which every job state transition is
//!   published to the system of record (an HTTP layer's download table, or
//!   an in-memory sink in tests).
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use downpool::core::{CancelToken, InMemoryStatusSink, Scheduler};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let sink = Arc::new(InMemoryStatusSink::new(16));
//! let scheduler = Scheduler::new(2, sink.clone());
//!
//! let cancel = CancelToken::new();
//! scheduler.submit(42, async move {
//!     // fetch and store the track here
//!     Ok(())
//! }, cancel, 0)?;
//!
//! // a settings update raises the bound without touching running jobs
//! scheduler.update_concurrency(4);
//!
//! // stop a job whether it is still queued or already running
//! scheduler.cancel(42);
//!
//! scheduler.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! The scheduler does not persist its queue across restarts, does not
//! retry failed jobs, and treats each unit of work as opaque; transport,
//! persistence, and the HTTP surface live in the consuming application.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod util;

pub use config::SchedulerConfig;
pub use core::{
    AdmissionGate, AdmissionPermit, CancelState, CancelToken, InMemoryStatusSink, JobId, JobState,
    NullStatusSink, Priority, Scheduler, SchedulerError, StatusRecord, StatusSink,
};
