//! Scheduler configuration.

mod scheduler;

pub use scheduler::SchedulerConfig;
