//! Filtered, sorted, cursor-paginated reads, including relationship
//! filters on orders.

#![allow(clippy::unwrap_used)]

use meridian_core::{
    NewOrder, NewProduct, OrderPredicate, OrderQuery, PageRequest, Product, ProductPredicate,
    ProductQuery, ProductSortField, Sort,
};
use meridian_engine::{CrmEngine, EngineError};
use meridian_store::MemoryStore;

use meridian_integration_tests::{dec, engine, seed_catalog, seed_customers};

/// Walk every page of a product query, asserting page sizes on the way.
async fn collect_all_pages(
    engine: &CrmEngine<MemoryStore>,
    mut query: ProductQuery,
) -> Vec<Product> {
    let limit = query.page.limit;
    let mut all = Vec::new();
    loop {
        let page = engine.all_products(&query).await.unwrap();
        assert!(page.items.len() as u32 <= limit);
        let expect_more = page.has_next;
        all.extend(page.items);
        match page.end_cursor {
            Some(cursor) => {
                assert!(expect_more);
                query.page = PageRequest::after(cursor, limit);
            }
            None => {
                assert!(!expect_more);
                return all;
            }
        }
    }
}

#[tokio::test]
async fn test_price_band_sorted_by_stock_is_stable_across_pages() {
    let engine = engine();
    seed_catalog(&engine).await;

    // Mid-priced products: Phone (699.00), Headphones (149.99),
    // Monitor (229.00). Laptop and Keyboard fall outside the band.
    let query = ProductQuery {
        predicates: vec![
            ProductPredicate::PriceGte(dec("100")),
            ProductPredicate::PriceLte(dec("750")),
        ],
        sort: Sort::desc(ProductSortField::Stock),
        page: PageRequest::first(2),
    };

    let all = collect_all_pages(&engine, query).await;
    let names: Vec<&str> = all.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Headphones", "Phone", "Monitor"]);

    let stocks: Vec<i32> = all.iter().map(|p| p.stock).collect();
    assert_eq!(stocks, vec![25, 15, 8]);
}

#[tokio::test]
async fn test_equal_sort_keys_paginate_without_duplicates() {
    let engine = engine();
    // Ten products with identical price and stock; only the ID
    // tie-break distinguishes them.
    for i in 0..10 {
        engine
            .create_product(&NewProduct {
                name: format!("Widget {i}"),
                price: dec("5.00"),
                stock: Some(7),
            })
            .await
            .unwrap();
    }

    let query = ProductQuery {
        predicates: vec![],
        sort: Sort::desc(ProductSortField::Stock),
        page: PageRequest::first(3),
    };

    let all = collect_all_pages(&engine, query).await;
    assert_eq!(all.len(), 10);

    let mut ids: Vec<i32> = all.iter().map(|p| p.id.into()).collect();
    let before = ids.clone();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 10);
    // Descending sort with descending ID tie-break.
    assert!(before.windows(2).all(|w| w.first() > w.get(1)));
}

#[tokio::test]
async fn test_relationship_filters_apply_before_pagination() {
    let engine = engine();
    let products = seed_catalog(&engine).await;
    let customers = seed_customers(&engine, 3).await;
    let laptop = products.first().unwrap();
    let keyboard = products.get(4).unwrap();

    // Six orders alternating between laptop and keyboard.
    for i in 0..6_usize {
        let product = if i % 2 == 0 { laptop } else { keyboard };
        engine
            .create_order(&NewOrder {
                customer_id: customers.get(i % 3).unwrap().id,
                product_ids: vec![product.id],
                order_date: None,
            })
            .await
            .unwrap();
    }

    // Page through laptop orders one at a time. If the filter ran after
    // pagination, keyboard-only pages would come back empty.
    let mut query = OrderQuery {
        predicates: vec![OrderPredicate::ProductNameContains("laptop".to_owned())],
        sort: Sort::default(),
        page: PageRequest::first(1),
    };
    let mut seen = 0;
    loop {
        let page = engine.all_orders(&query).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.items.first().unwrap().product_ids.contains(&laptop.id));
        seen += 1;
        match page.end_cursor {
            Some(cursor) => query.page = PageRequest::after(cursor, 1),
            None => break,
        }
    }
    assert_eq!(seen, 3);

    // Customer-name filter narrows the same way.
    let page = engine
        .all_orders(&OrderQuery {
            predicates: vec![OrderPredicate::CustomerNameContains(
                "customer 1".to_owned(),
            )],
            ..OrderQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(page.items.len(), 2);
}

#[tokio::test]
async fn test_malformed_cursor_is_a_validation_error() {
    let engine = engine();
    seed_catalog(&engine).await;

    let query = ProductQuery {
        predicates: vec![],
        sort: Sort::default(),
        page: PageRequest::after("definitely-not-a-cursor!".to_owned().into(), 10),
    };

    let err = engine.all_products(&query).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn test_zero_limit_is_clamped_to_one() {
    let engine = engine();
    seed_catalog(&engine).await;

    let page = engine
        .all_products(&ProductQuery {
            predicates: vec![],
            sort: Sort::default(),
            page: PageRequest::first(0),
        })
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert!(page.has_next);
}
