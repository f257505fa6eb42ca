//! Order creation: derived totals, reference checks, atomicity.

#![allow(clippy::unwrap_used)]

use meridian_core::{CustomerId, NewOrder, OrderPredicate, OrderQuery, ProductQuery};
use meridian_engine::EngineError;

use meridian_integration_tests::{dec, engine, seed_catalog, seed_customers};

#[tokio::test]
async fn test_total_is_exact_decimal_sum() {
    let engine = engine();
    let products = seed_catalog(&engine).await;
    let customer = seed_customers(&engine, 1).await.remove(0);

    // Laptop 999.99 + Phone 699.00 + Headphones 149.99
    let created = engine
        .create_order(&NewOrder {
            customer_id: customer.id,
            product_ids: products.iter().take(3).map(|p| p.id).collect(),
            order_date: None,
        })
        .await
        .unwrap();

    assert_eq!(created.order.total_amount, dec("1848.98"));
}

#[tokio::test]
async fn test_duplicate_product_ids_count_once() {
    let engine = engine();
    let products = seed_catalog(&engine).await;
    let customer = seed_customers(&engine, 1).await.remove(0);
    let laptop = products.first().unwrap();

    let created = engine
        .create_order(&NewOrder {
            customer_id: customer.id,
            product_ids: vec![laptop.id, laptop.id, laptop.id],
            order_date: None,
        })
        .await
        .unwrap();

    assert_eq!(created.order.total_amount, dec("999.99"));
    assert_eq!(created.order.product_ids.len(), 1);
}

#[tokio::test]
async fn test_empty_product_list_is_rejected_before_any_write() {
    let engine = engine();
    let customer = seed_customers(&engine, 1).await.remove(0);

    let err = engine
        .create_order(&NewOrder {
            customer_id: customer.id,
            product_ids: vec![],
            order_date: None,
        })
        .await
        .unwrap_err();

    match err {
        EngineError::Validation(errors) => {
            assert_eq!(errors.first().unwrap().field, "product_ids");
        }
        other => panic!("expected Validation, got {other:?}"),
    }

    let (_, _, orders) = engine.store().row_counts().await;
    assert_eq!(orders, 0);
}

#[tokio::test]
async fn test_dangling_references_write_nothing() {
    let engine = engine();
    let products = seed_catalog(&engine).await;
    let customer = seed_customers(&engine, 1).await.remove(0);

    // Unknown customer.
    let err = engine
        .create_order(&NewOrder {
            customer_id: CustomerId::new(9999),
            product_ids: vec![products.first().unwrap().id],
            order_date: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    // Known customer, one unknown product among valid ones.
    let err = engine
        .create_order(&NewOrder {
            customer_id: customer.id,
            product_ids: vec![products.first().unwrap().id, 9999.into()],
            order_date: None,
        })
        .await
        .unwrap_err();
    match err {
        EngineError::NotFound(message) => assert!(message.contains("9999")),
        other => panic!("expected NotFound, got {other:?}"),
    }

    let (customers, product_count, orders) = engine.store().row_counts().await;
    assert_eq!(customers, 1);
    assert_eq!(product_count, 5);
    assert_eq!(orders, 0);
}

#[tokio::test]
async fn test_order_creation_never_touches_stock() {
    let engine = engine();
    let products = seed_catalog(&engine).await;
    let customer = seed_customers(&engine, 1).await.remove(0);

    engine
        .create_order(&NewOrder {
            customer_id: customer.id,
            product_ids: products.iter().map(|p| p.id).collect(),
            order_date: None,
        })
        .await
        .unwrap();

    let after = engine.all_products(&ProductQuery::default()).await.unwrap();
    let stocks: Vec<i32> = after.items.iter().map(|p| p.stock).collect();
    assert_eq!(stocks, vec![10, 15, 25, 8, 30]);
}

#[tokio::test]
async fn test_committed_order_is_queryable() {
    let engine = engine();
    let products = seed_catalog(&engine).await;
    let customer = seed_customers(&engine, 1).await.remove(0);

    let created = engine
        .create_order(&NewOrder {
            customer_id: customer.id,
            product_ids: vec![products.first().unwrap().id],
            order_date: None,
        })
        .await
        .unwrap();

    let page = engine
        .all_orders(&OrderQuery {
            predicates: vec![OrderPredicate::TotalAmountGte(dec("999.99"))],
            ..OrderQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items.first().unwrap().id, created.order.id);
}
