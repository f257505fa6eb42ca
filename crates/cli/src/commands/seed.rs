//! Database seeding command.
//!
//! Loads a small sample data set through the engine, so the seeded rows
//! pass the same validation and total derivation as production writes.
//! Safe to rerun: duplicate customers conflict and are skipped, and
//! products/orders are only created into an empty table.

use chrono::{Duration, Utc};

use meridian_core::{
    Customer, CustomerQuery, NewCustomer, NewOrder, NewProduct, OrderQuery, Product, ProductQuery,
};
use meridian_engine::CrmEngine;
use meridian_store::{PgStore, create_pool};

use crate::config::CrmConfig;

fn sample_customers() -> Vec<NewCustomer> {
    [
        ("Alice Johnson", "alice@example.com", "+1234567890"),
        ("Bob Smith", "bob@example.com", "123-456-7890"),
        ("Carol Baker", "carol@example.com", "+14445556666"),
        ("Dave Wilson", "dave@example.com", "+15105551234"),
        ("Eve Cooper", "eve@example.com", "555-000-1212"),
    ]
    .into_iter()
    .map(|(name, email, phone)| NewCustomer {
        name: name.to_owned(),
        email: email.to_owned(),
        phone: Some(phone.to_owned()),
    })
    .collect()
}

fn sample_products() -> Vec<(&'static str, &'static str, i32)> {
    vec![
        ("Laptop", "999.99", 10),
        ("Phone", "699.00", 15),
        ("Headphones", "149.99", 25),
        ("Monitor", "229.00", 8),
        ("Keyboard", "89.50", 30),
    ]
}

/// Seed the database with sample customers, products, and orders.
pub async fn run(config: &CrmConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pool = create_pool(&config.database_url).await?;
    let engine = CrmEngine::new(PgStore::new(pool));

    let outcome = engine.bulk_create_customers(&sample_customers()).await;
    for error in &outcome.errors {
        tracing::debug!(row = error.row, "Skipping customer: {}", error.message);
    }

    if engine
        .all_products(&ProductQuery::default())
        .await?
        .items
        .is_empty()
    {
        for (name, price, stock) in sample_products() {
            engine
                .create_product(&NewProduct {
                    name: name.to_owned(),
                    price: price.parse()?,
                    stock: Some(stock),
                })
                .await?;
        }
    }

    let customers: Vec<Customer> = engine
        .all_customers(&CustomerQuery::default())
        .await?
        .items;
    let products: Vec<Product> = engine.all_products(&ProductQuery::default()).await?.items;

    let orders = engine.all_orders(&OrderQuery::default()).await?.items;
    let mut created_orders = 0;
    if orders.is_empty() && !customers.is_empty() && !products.is_empty() {
        for i in 0..5_usize {
            let Some(customer) = customers.get(i % customers.len()) else {
                break;
            };
            // 1-3 products per order, rotating through the catalog.
            let count = (i % 3) + 1;
            let product_ids = (0..count)
                .filter_map(|k| products.get((i + k) % products.len()))
                .map(|p| p.id)
                .collect();

            engine
                .create_order(&NewOrder {
                    customer_id: customer.id,
                    product_ids,
                    order_date: Some(Utc::now() - Duration::days(i64::try_from(i % 7)?)),
                })
                .await?;
            created_orders += 1;
        }
    }

    tracing::info!(
        customers = customers.len(),
        products = products.len(),
        orders = created_orders,
        "Seed complete"
    );
    Ok(())
}
