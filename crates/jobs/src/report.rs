//! Weekly aggregate report.

use meridian_store::{Store, StoreTx};

use crate::sink::LogSink;
use crate::{JobError, log_failure, stamp};

/// Appends one summary line with customer count, order count, and total
/// revenue. All three aggregates come from a single store snapshot, so
/// the line is internally consistent even while mutations are in flight.
#[derive(Debug, Clone)]
pub struct ReportJob<S, L> {
    store: S,
    sink: L,
}

impl<S: Store, L: LogSink> ReportJob<S, L> {
    pub const fn new(store: S, sink: L) -> Self {
        Self { store, sink }
    }

    /// Run once; a failure is logged to the sink, never propagated.
    pub async fn run(&self) {
        if let Err(error) = self.execute().await {
            log_failure(&self.sink, "report", &error);
        }
    }

    async fn execute(&self) -> Result<(), JobError> {
        let mut tx = self.store.begin().await?;
        let totals = tx.report_totals().await?;
        tx.rollback().await?;

        self.sink.append(&format!(
            "{} - Report: {} customers, {} orders, {} revenue",
            stamp(),
            totals.customers,
            totals.orders,
            totals.revenue
        ))?;
        tracing::info!(
            customers = totals.customers,
            orders = totals.orders,
            revenue = %totals.revenue,
            "Report run finished"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use meridian_core::{CustomerRecord, OrderRecord, ProductRecord};
    use meridian_store::MemoryStore;

    use super::*;
    use crate::sink::MemorySink;

    #[tokio::test]
    async fn test_report_line_totals() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let customer = tx
            .insert_customer(CustomerRecord {
                name: "Alice Johnson".to_owned(),
                email: "alice@example.com".parse().unwrap(),
                phone: None,
            })
            .await
            .unwrap();
        let product = tx
            .insert_product(ProductRecord {
                name: "Headphones".to_owned(),
                price: "149.99".parse().unwrap(),
                stock: 25,
            })
            .await
            .unwrap();
        for _ in 0..2 {
            tx.insert_order(OrderRecord {
                customer_id: customer.id,
                product_ids: vec![product.id],
                total_amount: "149.99".parse().unwrap(),
                order_date: Utc::now(),
            })
            .await
            .unwrap();
        }
        tx.commit().await.unwrap();

        let sink = Arc::new(MemorySink::new());
        ReportJob::new(store, Arc::clone(&sink)).run().await;

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert!(
            lines
                .first()
                .unwrap()
                .ends_with("- Report: 1 customers, 2 orders, 299.98 revenue")
        );
    }

    #[tokio::test]
    async fn test_empty_store_reports_zeroes() {
        let sink = Arc::new(MemorySink::new());
        ReportJob::new(MemoryStore::new(), Arc::clone(&sink))
            .run()
            .await;

        assert!(
            sink.lines()
                .first()
                .unwrap()
                .ends_with("- Report: 0 customers, 0 orders, 0 revenue")
        );
    }
}
