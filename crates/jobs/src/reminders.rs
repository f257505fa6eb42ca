//! Order reminders.

use chrono::{Duration, Utc};
use meridian_store::{Store, StoreTx};

use crate::sink::LogSink;
use crate::{JobError, log_failure, stamp};

/// Default lookback window for reminder-worthy orders.
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

/// Emits one reminder line per order placed inside the lookback window.
///
/// Read-only: the job never mutates entity state, it only appends to its
/// sink. Reminder delivery itself (email, SMS) is out of scope; a
/// downstream consumer tails the sink.
#[derive(Debug, Clone)]
pub struct ReminderJob<S, L> {
    store: S,
    sink: L,
    window_days: i64,
}

impl<S: Store, L: LogSink> ReminderJob<S, L> {
    pub const fn new(store: S, sink: L, window_days: i64) -> Self {
        Self {
            store,
            sink,
            window_days,
        }
    }

    /// Run once; a failure is logged to the sink, never propagated.
    pub async fn run(&self) {
        if let Err(error) = self.execute().await {
            log_failure(&self.sink, "reminders", &error);
        }
    }

    async fn execute(&self) -> Result<(), JobError> {
        let since = Utc::now() - Duration::days(self.window_days);

        let mut tx = self.store.begin().await?;
        let reminders = tx.orders_since(since).await?;
        tx.rollback().await?;

        let ts = stamp();
        for reminder in &reminders {
            self.sink.append(&format!(
                "{ts} Reminder: order_id={} email={}",
                reminder.order_id, reminder.email
            ))?;
        }
        tracing::info!(reminders = reminders.len(), "Order reminders processed");
        Ok(())
    }
}
