//! Background sync daemon: the reconciliation scheduler plus tracing setup.

mod error;
mod runtime;
pub mod scheduler;

pub use error::DaemonError;
pub use runtime::{init_tracing, run, start_blocking};
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerHandle, SyncEvent, SYNC_COMPLETED_EVENT};
