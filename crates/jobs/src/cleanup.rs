//! Stale-customer cleanup.

use chrono::{Duration, Utc};
use meridian_store::{Store, StoreTx};

use crate::sink::LogSink;
use crate::{JobError, log_failure, stamp};

/// Default order-recency window: a customer with no order in this many
/// days is stale.
pub const DEFAULT_RETENTION_DAYS: i64 = 365;

/// Deletes customers with no orders inside the retention window.
///
/// Candidate selection and deletion are one atomic store operation, so
/// an order placed concurrently either lands before the snapshot (the
/// customer survives) or after the delete (it fails its reference
/// check); a customer is never deleted out from under a new order.
/// Deleting a customer cascades to their orders.
#[derive(Debug, Clone)]
pub struct CleanupJob<S, L> {
    store: S,
    sink: L,
    retention_days: i64,
}

impl<S: Store, L: LogSink> CleanupJob<S, L> {
    pub const fn new(store: S, sink: L, retention_days: i64) -> Self {
        Self {
            store,
            sink,
            retention_days,
        }
    }

    /// Run once; a failure is logged to the sink, never propagated.
    pub async fn run(&self) {
        if let Err(error) = self.execute().await {
            log_failure(&self.sink, "cleanup", &error);
        }
    }

    async fn execute(&self) -> Result<(), JobError> {
        let cutoff = Utc::now() - Duration::days(self.retention_days);

        let mut tx = self.store.begin().await?;
        let deleted = tx.delete_customers_without_orders_since(cutoff).await?;
        tx.commit().await?;

        self.sink.append(&format!(
            "{} Deleted customers without orders in last year: {deleted}",
            stamp()
        ))?;
        tracing::info!(deleted, "Cleanup run finished");
        Ok(())
    }
}
