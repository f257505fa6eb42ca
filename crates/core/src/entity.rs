//! The Customer / Product / Order domain model.
//!
//! Three kinds of type live here:
//!
//! - **Entities** ([`Customer`], [`Product`], [`Order`]) - persisted rows as
//!   the store returns them, with store-assigned IDs.
//! - **Inputs** ([`NewCustomer`], [`NewProduct`], [`NewOrder`]) - raw
//!   creation requests as they arrive at the API boundary, before any
//!   validation has run. Strings stay strings here; validation turns them
//!   into records or field errors.
//! - **Records** ([`CustomerRecord`], [`ProductRecord`], [`OrderRecord`]) -
//!   validated values ready to be written by a store transaction.
//!
//! Monetary fields are [`Decimal`] and serialize as exact strings so no
//! floating-point rounding can creep in at a serialization boundary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CustomerId, Email, OrderId, Phone, ProductId};

// =============================================================================
// Entities
// =============================================================================

/// A customer on record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Customer {
    /// Store-assigned ID, immutable.
    pub id: CustomerId,
    /// Display name, never empty.
    pub name: String,
    /// Email address, unique across the store.
    pub email: Email,
    /// Optional phone number.
    pub phone: Option<Phone>,
    /// Assigned at creation, immutable.
    pub created_at: DateTime<Utc>,
}

/// A product in the catalog.
///
/// `stock` is the only frequently-contended mutable field in the system.
/// Order creation never touches it; the replenishment job is the sole
/// writer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    /// Store-assigned ID, immutable.
    pub id: ProductId,
    /// Display name, never empty.
    pub name: String,
    /// Unit price, always > 0, exact decimal.
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    /// Units on hand, never negative.
    pub stock: i32,
}

/// An order placed by a customer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Order {
    /// Store-assigned ID, immutable.
    pub id: OrderId,
    /// The customer who placed the order.
    pub customer_id: CustomerId,
    /// Referenced products, never empty.
    pub product_ids: Vec<ProductId>,
    /// Sum of the referenced products' prices at creation time.
    /// Immutable once computed; later price changes do not propagate.
    #[serde(with = "rust_decimal::serde::str")]
    pub total_amount: Decimal,
    /// Assigned at creation; may be set explicitly for backfill.
    pub order_date: DateTime<Utc>,
}

// =============================================================================
// Inputs
// =============================================================================

/// Raw input for creating a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCustomer {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Optional phone number.
    pub phone: Option<String>,
}

/// Raw input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    /// Display name.
    pub name: String,
    /// Unit price, transmitted as an exact-precision string.
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    /// Initial stock; defaults to 0 when omitted.
    pub stock: Option<i32>,
}

/// Raw input for creating an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    /// The customer placing the order.
    pub customer_id: CustomerId,
    /// Products to include; must be non-empty.
    pub product_ids: Vec<ProductId>,
    /// Explicit order date for backfill; defaults to now.
    pub order_date: Option<DateTime<Utc>>,
}

// =============================================================================
// Records
// =============================================================================

/// A validated customer ready for insertion.
#[derive(Debug, Clone)]
pub struct CustomerRecord {
    /// Display name, already checked non-empty.
    pub name: String,
    /// Parsed email.
    pub email: Email,
    /// Parsed phone, if any.
    pub phone: Option<Phone>,
}

/// A validated product ready for insertion.
#[derive(Debug, Clone)]
pub struct ProductRecord {
    /// Display name, already checked non-empty.
    pub name: String,
    /// Unit price, already checked > 0.
    pub price: Decimal,
    /// Initial stock, already checked >= 0.
    pub stock: i32,
}

/// A validated order ready for insertion.
///
/// The order row and its product associations are written atomically by
/// `StoreTx::insert_order`; a partially associated order is never
/// observable.
#[derive(Debug, Clone)]
pub struct OrderRecord {
    /// Resolved customer.
    pub customer_id: CustomerId,
    /// Resolved products, non-empty.
    pub product_ids: Vec<ProductId>,
    /// Pre-computed total, sum of resolved prices.
    pub total_amount: Decimal,
    /// Effective order date.
    pub order_date: DateTime<Utc>,
}

// =============================================================================
// Job-facing read models
// =============================================================================

/// One order due a reminder: the order plus the owning customer's email.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderReminder {
    /// The order needing a reminder.
    pub order_id: OrderId,
    /// Email of the customer who placed it.
    pub email: Email,
}

/// Aggregate totals for the periodic report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportTotals {
    /// Total customer count.
    pub customers: i64,
    /// Total order count.
    pub orders: i64,
    /// Sum of all order totals.
    #[serde(with = "rust_decimal::serde::str")]
    pub revenue: Decimal,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_product_price_serializes_as_string() {
        let product = Product {
            id: ProductId::new(1),
            name: "Laptop".to_owned(),
            price: dec("999.99"),
            stock: 10,
        };
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["price"], serde_json::json!("999.99"));
    }

    #[test]
    fn test_new_product_price_parses_from_string() {
        let input: NewProduct =
            serde_json::from_str(r#"{"name":"Monitor","price":"229.00","stock":8}"#).unwrap();
        assert_eq!(input.price, dec("229.00"));
        assert_eq!(input.stock, Some(8));
    }

    #[test]
    fn test_order_total_roundtrip() {
        let order = Order {
            id: OrderId::new(5),
            customer_id: CustomerId::new(1),
            product_ids: vec![ProductId::new(1), ProductId::new(2)],
            total_amount: dec("1149.98"),
            order_date: Utc::now(),
        };
        let json = serde_json::to_string(&order).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(back, order);
    }
}
