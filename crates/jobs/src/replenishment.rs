//! Low-stock replenishment.

use meridian_store::{Store, StoreTx};

use crate::sink::LogSink;
use crate::{JobError, log_failure, stamp};

/// Default stock level below which a product is considered low.
pub const DEFAULT_THRESHOLD: i32 = 10;
/// Default number of units added to each low-stock product.
pub const DEFAULT_AMOUNT: i32 = 10;

/// Tops up every product whose stock is below a threshold.
///
/// The restock is a single atomic store operation: the set of qualifying
/// products and their increments commit together, so a concurrent run
/// never double-increments. A product topped up past the threshold no
/// longer qualifies, which makes back-to-back runs converge instead of
/// growing stock without bound.
#[derive(Debug, Clone)]
pub struct ReplenishmentJob<S, L> {
    store: S,
    sink: L,
    threshold: i32,
    amount: i32,
}

impl<S: Store, L: LogSink> ReplenishmentJob<S, L> {
    pub const fn new(store: S, sink: L, threshold: i32, amount: i32) -> Self {
        Self {
            store,
            sink,
            threshold,
            amount,
        }
    }

    /// Run once; a failure is logged to the sink, never propagated.
    pub async fn run(&self) {
        if let Err(error) = self.execute().await {
            log_failure(&self.sink, "replenishment", &error);
        }
    }

    async fn execute(&self) -> Result<(), JobError> {
        let mut tx = self.store.begin().await?;
        let updated = tx.restock_below(self.threshold, self.amount).await?;
        tx.commit().await?;

        let ts = stamp();
        for product in &updated {
            self.sink.append(&format!(
                "{ts} Updated '{}' -> stock={}",
                product.name, product.stock
            ))?;
        }
        tracing::info!(updated = updated.len(), "Replenishment run finished");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use meridian_core::ProductRecord;
    use meridian_store::MemoryStore;

    use super::*;
    use crate::sink::MemorySink;

    async fn seed_product(store: &MemoryStore, name: &str, stock: i32) {
        let mut tx = store.begin().await.unwrap();
        tx.insert_product(ProductRecord {
            name: name.to_owned(),
            price: "9.99".parse().unwrap(),
            stock,
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_replenishes_only_low_stock() {
        let store = MemoryStore::new();
        seed_product(&store, "Monitor", 3).await;
        seed_product(&store, "Keyboard", 30).await;

        let sink = Arc::new(MemorySink::new());
        let job = ReplenishmentJob::new(
            store.clone(),
            Arc::clone(&sink),
            DEFAULT_THRESHOLD,
            DEFAULT_AMOUNT,
        );
        job.run().await;

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines.first().unwrap().ends_with("Updated 'Monitor' -> stock=13"));
    }

    #[tokio::test]
    async fn test_back_to_back_runs_converge() {
        let store = MemoryStore::new();
        seed_product(&store, "Monitor", 3).await;

        let sink = Arc::new(MemorySink::new());
        let job = ReplenishmentJob::new(
            store.clone(),
            Arc::clone(&sink),
            DEFAULT_THRESHOLD,
            DEFAULT_AMOUNT,
        );
        job.run().await;
        job.run().await;

        // Second run finds nothing below threshold and logs nothing.
        assert_eq!(sink.lines().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_logged_not_raised() {
        let store = MemoryStore::new();
        store.fail_next().await;

        let sink = Arc::new(MemorySink::new());
        let job = ReplenishmentJob::new(store, Arc::clone(&sink), DEFAULT_THRESHOLD, DEFAULT_AMOUNT);
        job.run().await;

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines.first().unwrap().contains("ERROR:"));
    }
}
