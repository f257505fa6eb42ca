//! Scheduled jobs run against engine-produced data.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::{Duration, Utc};

use meridian_core::{NewCustomer, NewOrder, ProductPredicate, ProductQuery};
use meridian_jobs::{CleanupJob, MemorySink, ReminderJob, ReplenishmentJob, ReportJob};

use meridian_integration_tests::{engine, seed_catalog, seed_customers};

#[tokio::test]
async fn test_replenishment_tops_up_only_low_stock() {
    let engine = engine();
    seed_catalog(&engine).await;

    let sink = Arc::new(MemorySink::new());
    let job = ReplenishmentJob::new(engine.store().clone(), Arc::clone(&sink), 10, 10);
    job.run().await;

    // Only Monitor started below 10.
    let lines = sink.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines.first().unwrap().ends_with("Updated 'Monitor' -> stock=18"));

    let page = engine
        .all_products(&ProductQuery {
            predicates: vec![ProductPredicate::NameContains("monitor".to_owned())],
            ..ProductQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(page.items.first().unwrap().stock, 18);

    // A second run finds nothing below threshold.
    job.run().await;
    assert_eq!(sink.lines().len(), 1);
}

#[tokio::test]
async fn test_cleanup_spares_customers_with_recent_orders() {
    let engine = engine();
    let products = seed_catalog(&engine).await;
    let customers = seed_customers(&engine, 2).await;

    // First customer ordered 400 days ago, second 10 days ago.
    for (customer, age_days) in customers.iter().zip([400_i64, 10]) {
        engine
            .create_order(&NewOrder {
                customer_id: customer.id,
                product_ids: vec![products.first().unwrap().id],
                order_date: Some(Utc::now() - Duration::days(age_days)),
            })
            .await
            .unwrap();
    }

    let sink = Arc::new(MemorySink::new());
    CleanupJob::new(engine.store().clone(), Arc::clone(&sink), 365)
        .run()
        .await;

    let lines = sink.lines();
    assert!(
        lines
            .first()
            .unwrap()
            .ends_with("Deleted customers without orders in last year: 1")
    );

    let (remaining_customers, _, remaining_orders) = engine.store().row_counts().await;
    assert_eq!(remaining_customers, 1);
    assert_eq!(remaining_orders, 1);
}

#[tokio::test]
async fn test_reminders_cover_the_window_only() {
    let engine = engine();
    let products = seed_catalog(&engine).await;
    let customer = seed_customers(&engine, 1).await.remove(0);

    for age_days in [1_i64, 6, 8, 30] {
        engine
            .create_order(&NewOrder {
                customer_id: customer.id,
                product_ids: vec![products.first().unwrap().id],
                order_date: Some(Utc::now() - Duration::days(age_days)),
            })
            .await
            .unwrap();
    }

    let sink = Arc::new(MemorySink::new());
    ReminderJob::new(engine.store().clone(), Arc::clone(&sink), 7)
        .run()
        .await;

    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    for line in &lines {
        assert!(line.contains("Reminder: order_id="));
        assert!(line.ends_with("email=customer1@example.com"));
    }
}

#[tokio::test]
async fn test_report_totals_reflect_engine_activity() {
    let engine = engine();
    let products = seed_catalog(&engine).await;
    let customers = seed_customers(&engine, 2).await;

    for customer in &customers {
        // Laptop 999.99 each.
        engine
            .create_order(&NewOrder {
                customer_id: customer.id,
                product_ids: vec![products.first().unwrap().id],
                order_date: None,
            })
            .await
            .unwrap();
    }

    let sink = Arc::new(MemorySink::new());
    ReportJob::new(engine.store().clone(), Arc::clone(&sink))
        .run()
        .await;

    assert!(
        sink.lines()
            .first()
            .unwrap()
            .ends_with("- Report: 2 customers, 2 orders, 1999.98 revenue")
    );
}

#[tokio::test]
async fn test_job_failure_lands_in_the_log_not_the_caller() {
    let engine = engine();
    let sink = Arc::new(MemorySink::new());
    let job = ReportJob::new(engine.store().clone(), Arc::clone(&sink));

    engine.store().fail_next().await;
    job.run().await;

    let lines = sink.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines.first().unwrap().contains("ERROR:"));

    // The store works again afterwards; entity writes were unaffected.
    engine
        .create_customer(&NewCustomer {
            name: "After".to_owned(),
            email: "after@example.com".to_owned(),
            phone: None,
        })
        .await
        .unwrap();
}
