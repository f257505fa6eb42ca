//! The mutation and query engine.

use std::collections::BTreeSet;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use meridian_core::{
    Customer, CustomerQuery, NewCustomer, NewOrder, NewProduct, Order, OrderQuery, OrderRecord,
    Page, Product, ProductId, ProductQuery,
};
use meridian_store::{Store, StoreTx};

use crate::error::EngineError;
use crate::validation;

/// Result of a successful `create_customer`.
#[derive(Debug, Clone)]
pub struct CreatedCustomer {
    /// The persisted customer.
    pub customer: Customer,
    /// Human-readable confirmation.
    pub message: String,
}

/// One failed item in a bulk create.
#[derive(Debug, Clone)]
pub struct BulkError {
    /// 1-based position of the failed item in the input sequence.
    pub row: usize,
    /// What went wrong with it.
    pub message: String,
}

/// Outcome of a bulk create: partial success is the contract.
///
/// `customers` holds every successfully created row in input order;
/// `errors` describes every failed item. One item's failure never rolls
/// back or blocks its siblings.
#[derive(Debug, Clone, Default)]
pub struct BulkOutcome {
    /// Successfully created customers, in input order.
    pub customers: Vec<Customer>,
    /// Per-item failures, in input order.
    pub errors: Vec<BulkError>,
}

/// Result of a successful `create_order`: the order with its resolved
/// customer and products.
#[derive(Debug, Clone)]
pub struct CreatedOrder {
    /// The persisted order.
    pub order: Order,
    /// The customer who placed it.
    pub customer: Customer,
    /// The products on it, in order-line order.
    pub products: Vec<Product>,
}

/// The CRM mutation and query engine.
///
/// Generic over the store; every mutation runs inside one store
/// transaction, so a failed operation leaves no partial write behind.
#[derive(Debug, Clone)]
pub struct CrmEngine<S> {
    store: S,
}

impl<S: Store> CrmEngine<S> {
    /// Create an engine over the given store handle.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store handle.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a single customer.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Validation`] for malformed fields (pre-transaction).
    /// - [`EngineError::Conflict`] if the email is already taken.
    /// - [`EngineError::Internal`] on store failure; nothing is written.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create_customer(
        &self,
        input: &NewCustomer,
    ) -> Result<CreatedCustomer, EngineError> {
        let record = validation::validate_customer(input).map_err(EngineError::Validation)?;

        let mut tx = self.store.begin().await?;

        // In-transaction check gives a clean error message; the store's
        // unique index backstops the race.
        if tx
            .find_customer_by_email(record.email.as_str())
            .await?
            .is_some()
        {
            rollback_quietly(tx).await;
            return Err(EngineError::Conflict(format!(
                "email {} already exists",
                record.email
            )));
        }

        let customer = tx.insert_customer(record).await?;
        tx.commit().await?;

        info!(customer_id = %customer.id, "Customer created");
        Ok(CreatedCustomer {
            customer,
            message: "Customer created".to_owned(),
        })
    }

    /// Create customers in bulk with partial-failure semantics.
    ///
    /// Each item is validated and written in its own transaction; failed
    /// items are reported in the outcome instead of aborting the batch.
    /// Failed items are not retried - that is the caller's decision.
    #[instrument(skip(self, inputs), fields(count = inputs.len()))]
    pub async fn bulk_create_customers(&self, inputs: &[NewCustomer]) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for (index, input) in inputs.iter().enumerate() {
            match self.create_customer(input).await {
                Ok(created) => outcome.customers.push(created.customer),
                Err(error) => outcome.errors.push(BulkError {
                    row: index + 1,
                    message: error.to_string(),
                }),
            }
        }
        info!(
            created = outcome.customers.len(),
            failed = outcome.errors.len(),
            "Bulk customer create finished"
        );
        outcome
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Validation`] for empty name, price <= 0, or
    ///   negative stock.
    /// - [`EngineError::Internal`] on store failure; nothing is written.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(&self, input: &NewProduct) -> Result<Product, EngineError> {
        let record = validation::validate_product(input).map_err(EngineError::Validation)?;

        let mut tx = self.store.begin().await?;
        let product = tx.insert_product(record).await?;
        tx.commit().await?;

        info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// Create an order.
    ///
    /// Resolution, total computation, and persistence all run inside one
    /// transaction, so the total is computed from a single consistent
    /// snapshot of product prices and a partially associated order is
    /// never observable. Stock is deliberately untouched here; only the
    /// replenishment job writes it.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Validation`] if `product_ids` is empty
    ///   (pre-transaction).
    /// - [`EngineError::NotFound`] if the customer or any product id does
    ///   not resolve; the message lists every missing product id.
    /// - [`EngineError::Internal`] on store failure.
    ///
    /// In every error case nothing is written.
    #[instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn create_order(&self, input: &NewOrder) -> Result<CreatedOrder, EngineError> {
        validation::validate_order_shape(input).map_err(EngineError::Validation)?;

        // The order's product set ignores duplicates in the request.
        let mut seen = BTreeSet::new();
        let product_ids: Vec<ProductId> = input
            .product_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();

        let mut tx = self.store.begin().await?;

        let Some(customer) = tx.get_customer(input.customer_id).await? else {
            rollback_quietly(tx).await;
            return Err(EngineError::NotFound(format!(
                "customer {} not found",
                input.customer_id
            )));
        };

        let products = tx.get_products(&product_ids).await?;
        if products.len() != product_ids.len() {
            let found: BTreeSet<ProductId> = products.iter().map(|p| p.id).collect();
            let missing: Vec<String> = product_ids
                .iter()
                .filter(|id| !found.contains(id))
                .map(ToString::to_string)
                .collect();
            rollback_quietly(tx).await;
            return Err(EngineError::NotFound(format!(
                "product id(s) not found: {}",
                missing.join(", ")
            )));
        }

        let total_amount: Decimal = products.iter().map(|p| p.price).sum();
        let order_date = input.order_date.unwrap_or_else(Utc::now);

        let order = tx
            .insert_order(OrderRecord {
                customer_id: customer.id,
                product_ids,
                total_amount,
                order_date,
            })
            .await?;
        tx.commit().await?;

        info!(order_id = %order.id, total = %order.total_amount, "Order created");
        Ok(CreatedOrder {
            order,
            customer,
            products,
        })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// List customers: filtered, sorted, cursor-paginated.
    ///
    /// Read-only; observes a snapshot as of query start.
    ///
    /// # Errors
    ///
    /// [`EngineError::Validation`] for a malformed cursor,
    /// [`EngineError::Internal`] on store failure.
    pub async fn all_customers(&self, query: &CustomerQuery) -> Result<Page<Customer>, EngineError> {
        Ok(self.store.list_customers(query).await?)
    }

    /// List products: filtered, sorted, cursor-paginated.
    ///
    /// # Errors
    ///
    /// [`EngineError::Validation`] for a malformed cursor,
    /// [`EngineError::Internal`] on store failure.
    pub async fn all_products(&self, query: &ProductQuery) -> Result<Page<Product>, EngineError> {
        Ok(self.store.list_products(query).await?)
    }

    /// List orders: filtered, sorted, cursor-paginated. Relationship
    /// filters (customer name, product name) are applied before
    /// pagination.
    ///
    /// # Errors
    ///
    /// [`EngineError::Validation`] for a malformed cursor,
    /// [`EngineError::Internal`] on store failure.
    pub async fn all_orders(&self, query: &OrderQuery) -> Result<Page<Order>, EngineError> {
        Ok(self.store.list_orders(query).await?)
    }
}

async fn rollback_quietly<T: StoreTx>(tx: T) {
    if let Err(error) = tx.rollback().await {
        warn!(%error, "Rollback after failed operation also failed");
    }
}
