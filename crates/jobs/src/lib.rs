//! Meridian Jobs - Scheduled maintenance for the CRM.
//!
//! Five recurring jobs keep the data set healthy and observable:
//!
//! - [`ReplenishmentJob`] - top up low-stock products.
//! - [`CleanupJob`] - remove customers with no recent orders.
//! - [`ReminderJob`] - emit reminder lines for recent orders.
//! - [`ReportJob`] - aggregate customer/order/revenue totals.
//! - [`HeartbeatJob`] - liveness marker.
//!
//! Each job appends human-readable lines to its own [`LogSink`] and is
//! idempotent for a given data state: running it twice in a row performs
//! the second run against the already-corrected state (a replenished
//! product is no longer below threshold, a deleted customer is gone), so
//! an extra run does no harm beyond an extra log line.
//!
//! A job failure is contained: the error is appended to the job's sink
//! and the scheduler carries on. One job's failure never affects another
//! job or the serving path.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cleanup;
pub mod heartbeat;
pub mod reminders;
pub mod replenishment;
pub mod report;
pub mod scheduler;
pub mod sink;

use thiserror::Error;

pub use cleanup::CleanupJob;
pub use heartbeat::HeartbeatJob;
pub use reminders::ReminderJob;
pub use replenishment::ReplenishmentJob;
pub use report::ReportJob;
pub use scheduler::{JobIntervals, Scheduler};
pub use sink::{FileSink, LogSink, MemorySink};

/// Errors a job run can hit.
#[derive(Debug, Error)]
pub enum JobError {
    /// The store rejected or failed the job's unit of work.
    #[error(transparent)]
    Store(#[from] meridian_store::StoreError),

    /// The job's log sink could not be written.
    #[error("log sink error: {0}")]
    Log(#[from] std::io::Error),
}

/// Local wall-clock stamp used at the front of most job log lines.
fn stamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Append a `{ts} ERROR: {e}` line for a failed run; if even that
/// fails, the tracing record is all that remains.
fn log_failure(sink: &impl LogSink, job: &str, error: &JobError) {
    tracing::error!(job, %error, "Job run failed");
    if let Err(sink_error) = sink.append(&format!("{} ERROR: {error}", stamp())) {
        tracing::error!(job, %sink_error, "Could not record job failure in log sink");
    }
}
