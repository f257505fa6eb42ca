//! Meridian Store - The transactional entity store boundary.
//!
//! Persistence is accessed through a narrow repository interface rather
//! than entities that self-persist: [`Store`] hands out transactions
//! ([`StoreTx`]) scoped to one unit of work, plus read-side list operations
//! that translate the declarative query model from `meridian-core` into
//! store reads. There is no hidden global connection state; callers own a
//! store handle and pass it where it is needed.
//!
//! Two implementations ship:
//!
//! - [`PgStore`] - `PostgreSQL` via sqlx, one database transaction per
//!   [`StoreTx`], queries compiled with a runtime SQL builder.
//! - [`MemoryStore`] - a single-node reference store whose transactions
//!   serialize on one lock. Used by tests and local runs; it implements
//!   the same contract, including cascade deletes and email uniqueness.
//!
//! # Consistency
//!
//! Read-side lists observe a snapshot as of query start (the store's read
//! isolation). Each transaction is atomic: dropping a [`StoreTx`] without
//! committing rolls every staged write back.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod memory;
pub mod postgres;

use std::future::Future;

use chrono::{DateTime, Utc};
use thiserror::Error;

use meridian_core::{
    Customer, CustomerId, CustomerQuery, CustomerRecord, CursorError, Order, OrderQuery,
    OrderRecord, OrderReminder, Page, Product, ProductId, ProductQuery, ProductRecord,
    ReportTotals,
};

pub use memory::MemoryStore;
pub use postgres::{PgStore, create_pool};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Constraint violation (e.g., unique email, dangling reference).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A pagination cursor that this store did not produce.
    #[error(transparent)]
    InvalidCursor(#[from] CursorError),

    /// The store cannot be reached at all.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A transactional entity store.
///
/// Handles are cheap to clone and safe to share across tasks. The read
/// side lives directly on the store; every write goes through a
/// transaction obtained from [`Store::begin`].
pub trait Store: Clone + Send + Sync + 'static {
    /// The transaction type this store hands out.
    type Tx: StoreTx;

    /// Begin a transaction.
    fn begin(&self) -> impl Future<Output = Result<Self::Tx, StoreError>> + Send;

    /// List customers matching a query: filtered, sorted, paginated.
    fn list_customers(
        &self,
        query: &CustomerQuery,
    ) -> impl Future<Output = Result<Page<Customer>, StoreError>> + Send;

    /// List products matching a query: filtered, sorted, paginated.
    fn list_products(
        &self,
        query: &ProductQuery,
    ) -> impl Future<Output = Result<Page<Product>, StoreError>> + Send;

    /// List orders matching a query: filtered, sorted, paginated.
    ///
    /// Relationship predicates (customer name, product name) are applied
    /// before pagination.
    fn list_orders(
        &self,
        query: &OrderQuery,
    ) -> impl Future<Output = Result<Page<Order>, StoreError>> + Send;
}

/// One unit of work against the store.
///
/// All reads within a transaction observe a single consistent snapshot;
/// all writes become visible atomically on [`StoreTx::commit`]. Dropping
/// the transaction discards staged writes.
pub trait StoreTx: Send {
    /// Fetch a customer by ID.
    fn get_customer(
        &mut self,
        id: CustomerId,
    ) -> impl Future<Output = Result<Option<Customer>, StoreError>> + Send;

    /// Fetch a customer by exact email.
    fn find_customer_by_email(
        &mut self,
        email: &str,
    ) -> impl Future<Output = Result<Option<Customer>, StoreError>> + Send;

    /// Insert a customer.
    ///
    /// Fails with [`StoreError::Conflict`] if the email is already taken.
    fn insert_customer(
        &mut self,
        record: CustomerRecord,
    ) -> impl Future<Output = Result<Customer, StoreError>> + Send;

    /// Fetch the products whose IDs appear in `ids`, preserving input
    /// order. Missing IDs are simply absent from the result; the caller
    /// decides whether that is an error.
    fn get_products(
        &mut self,
        ids: &[ProductId],
    ) -> impl Future<Output = Result<Vec<Product>, StoreError>> + Send;

    /// Insert a product.
    fn insert_product(
        &mut self,
        record: ProductRecord,
    ) -> impl Future<Output = Result<Product, StoreError>> + Send;

    /// Insert an order row and its product associations atomically.
    ///
    /// Associations are stored and returned in ascending product id order
    /// regardless of the order they were requested in.
    fn insert_order(
        &mut self,
        record: OrderRecord,
    ) -> impl Future<Output = Result<Order, StoreError>> + Send;

    /// Top up every product with `stock < threshold` by `amount`, in one
    /// statement. Returns the updated products with their new stock.
    fn restock_below(
        &mut self,
        threshold: i32,
        amount: i32,
    ) -> impl Future<Output = Result<Vec<Product>, StoreError>> + Send;

    /// Delete every customer with zero orders dated at or after `cutoff`
    /// (customers with no orders at all qualify). Candidate selection and
    /// deletion happen as one atomic operation; their orders cascade.
    /// Returns the number of customers removed.
    fn delete_customers_without_orders_since(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Orders placed at or after `since`, with the owning customer's
    /// email. Read-only.
    fn orders_since(
        &mut self,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<OrderReminder>, StoreError>> + Send;

    /// Aggregate totals: customer count, order count, revenue sum.
    fn report_totals(&mut self) -> impl Future<Output = Result<ReportTotals, StoreError>> + Send;

    /// Commit the transaction, publishing all staged writes.
    fn commit(self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Roll the transaction back explicitly. (Dropping has the same
    /// effect; this form surfaces rollback errors.)
    fn rollback(self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
