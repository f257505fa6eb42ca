//! Integration test support for Meridian CRM.
//!
//! Tests in `tests/` exercise the engine, store, and jobs together
//! against [`MemoryStore`], which implements the same transactional
//! contract as the `PostgreSQL` store. No external services are needed:
//!
//! ```bash
//! cargo test -p meridian-integration-tests
//! ```
//!
//! This crate exports the shared fixtures: an engine over a fresh store
//! and the sample catalog/customer set used across scenarios.

#![cfg_attr(not(test), forbid(unsafe_code))]

use rust_decimal::Decimal;

use meridian_core::{Customer, NewCustomer, NewProduct, Product};
use meridian_engine::CrmEngine;
use meridian_store::MemoryStore;

/// Fresh engine over an empty in-memory store.
#[must_use]
pub fn engine() -> CrmEngine<MemoryStore> {
    CrmEngine::new(MemoryStore::new())
}

/// Parse a decimal literal in tests.
///
/// # Panics
///
/// Panics on a malformed literal.
#[must_use]
pub fn dec(s: &str) -> Decimal {
    s.parse().expect("malformed decimal literal")
}

/// The sample catalog: (name, price, stock) for five products.
#[must_use]
pub fn catalog() -> Vec<(&'static str, &'static str, i32)> {
    vec![
        ("Laptop", "999.99", 10),
        ("Phone", "699.00", 15),
        ("Headphones", "149.99", 25),
        ("Monitor", "229.00", 8),
        ("Keyboard", "89.50", 30),
    ]
}

/// Create the sample catalog through the engine; returns the products
/// in catalog order.
///
/// # Panics
///
/// Panics if any product is rejected.
pub async fn seed_catalog(engine: &CrmEngine<MemoryStore>) -> Vec<Product> {
    let mut products = Vec::new();
    for (name, price, stock) in catalog() {
        let product = engine
            .create_product(&NewProduct {
                name: name.to_owned(),
                price: dec(price),
                stock: Some(stock),
            })
            .await
            .expect("seed product rejected");
        products.push(product);
    }
    products
}

/// Create `n` customers named `Customer 1..n` with distinct emails.
///
/// # Panics
///
/// Panics if any customer is rejected.
pub async fn seed_customers(engine: &CrmEngine<MemoryStore>, n: usize) -> Vec<Customer> {
    let mut customers = Vec::new();
    for i in 1..=n {
        let created = engine
            .create_customer(&NewCustomer {
                name: format!("Customer {i}"),
                email: format!("customer{i}@example.com"),
                phone: None,
            })
            .await
            .expect("seed customer rejected");
        customers.push(created.customer);
    }
    customers
}
