//! In-memory reference store.
//!
//! Tables live behind a single `tokio` mutex. A transaction takes the
//! lock for its whole lifetime and mutates a staged copy of the tables;
//! commit publishes the copy, drop discards it. Transactions therefore
//! serialize - the strongest isolation the contract allows - which makes
//! this store a convenient oracle for tests and local runs.
//!
//! The store enforces the same integrity rules as the `PostgreSQL`
//! schema: unique customer emails, foreign keys on order insertion, and
//! cascade deletion of a removed customer's orders.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use meridian_core::{
    Customer, CustomerId, CustomerQuery, CustomerRecord, CustomerSortField, Order, OrderId,
    OrderQuery, OrderRecord, OrderReminder, OrderSortField, Page, Product, ProductId,
    ProductQuery, ProductRecord, ProductSortField, ReportTotals,
};

use crate::{Store, StoreError, StoreTx};

/// Relational tables plus ID counters.
#[derive(Debug, Clone, Default)]
struct Tables {
    customers: BTreeMap<CustomerId, Customer>,
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    next_customer_id: i32,
    next_product_id: i32,
    next_order_id: i32,
}

#[derive(Debug, Default)]
struct State {
    tables: Tables,
    fail_next: bool,
}

impl State {
    fn check_available(&mut self) -> Result<(), StoreError> {
        if self.fail_next {
            self.fail_next = false;
            return Err(StoreError::Unavailable(
                "injected failure".to_owned(),
            ));
        }
        Ok(())
    }
}

/// An in-memory [`Store`].
///
/// Cheap to clone; clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<State>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next store operation fail with [`StoreError::Unavailable`].
    ///
    /// Test hook for exercising failure paths (e.g. a scheduled job
    /// logging an error line instead of crashing).
    pub async fn fail_next(&self) {
        self.inner.lock().await.fail_next = true;
    }

    /// Row counts for (customers, products, orders). Test helper.
    pub async fn row_counts(&self) -> (usize, usize, usize) {
        let state = self.inner.lock().await;
        (
            state.tables.customers.len(),
            state.tables.products.len(),
            state.tables.orders.len(),
        )
    }
}

impl Store for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        let mut guard = Arc::clone(&self.inner).lock_owned().await;
        guard.check_available()?;
        let staged = guard.tables.clone();
        Ok(MemoryTx { guard, staged })
    }

    async fn list_customers(
        &self,
        query: &CustomerQuery,
    ) -> Result<Page<Customer>, StoreError> {
        let mut state = self.inner.lock().await;
        state.check_available()?;

        let mut matching: Vec<Customer> = state
            .tables
            .customers
            .values()
            .filter(|c| query.predicates.iter().all(|p| p.matches(c)))
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            let (a, b) = if query.sort.descending { (b, a) } else { (a, b) };
            let primary = match query.sort.field {
                CustomerSortField::Id => a.id.cmp(&b.id),
                CustomerSortField::Name => a.name.cmp(&b.name),
                CustomerSortField::Email => a.email.as_str().cmp(b.email.as_str()),
                CustomerSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            };
            // Tie-break on ID so pagination sees a total order.
            primary.then_with(|| a.id.cmp(&b.id))
        });

        paginate(matching, &query.page)
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>, StoreError> {
        let mut state = self.inner.lock().await;
        state.check_available()?;

        let mut matching: Vec<Product> = state
            .tables
            .products
            .values()
            .filter(|p| query.predicates.iter().all(|pred| pred.matches(p)))
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            let (a, b) = if query.sort.descending { (b, a) } else { (a, b) };
            let primary = match query.sort.field {
                ProductSortField::Id => a.id.cmp(&b.id),
                ProductSortField::Name => a.name.cmp(&b.name),
                ProductSortField::Price => a.price.cmp(&b.price),
                ProductSortField::Stock => a.stock.cmp(&b.stock),
            };
            primary.then_with(|| a.id.cmp(&b.id))
        });

        paginate(matching, &query.page)
    }

    async fn list_orders(&self, query: &OrderQuery) -> Result<Page<Order>, StoreError> {
        let mut state = self.inner.lock().await;
        state.check_available()?;
        let tables = &state.tables;

        let mut matching = Vec::new();
        for order in tables.orders.values() {
            let customer_name = tables
                .customers
                .get(&order.customer_id)
                .map(|c| c.name.clone())
                .ok_or_else(|| {
                    StoreError::DataCorruption(format!(
                        "order {} references missing customer {}",
                        order.id, order.customer_id
                    ))
                })?;
            let product_names = order
                .product_ids
                .iter()
                .map(|id| {
                    tables.products.get(id).map(|p| p.name.clone()).ok_or_else(|| {
                        StoreError::DataCorruption(format!(
                            "order {} references missing product {id}",
                            order.id
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let name_refs: Vec<&str> = product_names.iter().map(String::as_str).collect();

            if query
                .predicates
                .iter()
                .all(|p| p.matches(order, &customer_name, &name_refs))
            {
                matching.push(order.clone());
            }
        }

        matching.sort_by(|a, b| {
            let (a, b) = if query.sort.descending { (b, a) } else { (a, b) };
            let primary = match query.sort.field {
                OrderSortField::Id => a.id.cmp(&b.id),
                OrderSortField::OrderDate => a.order_date.cmp(&b.order_date),
                OrderSortField::TotalAmount => a.total_amount.cmp(&b.total_amount),
            };
            primary.then_with(|| a.id.cmp(&b.id))
        });

        paginate(matching, &query.page)
    }
}

fn paginate<T>(matching: Vec<T>, page: &meridian_core::PageRequest) -> Result<Page<T>, StoreError> {
    let offset = page.offset()?;
    let limit = page.clamped_limit();
    let start = usize::try_from(offset).unwrap_or(usize::MAX);
    let window: Vec<T> = matching
        .into_iter()
        .skip(start)
        .take(limit as usize + 1)
        .collect();
    Ok(Page::from_window(window, offset, limit))
}

/// A transaction over the in-memory store.
///
/// Owns the store lock until commit or drop.
#[derive(Debug)]
pub struct MemoryTx {
    guard: OwnedMutexGuard<State>,
    staged: Tables,
}

impl StoreTx for MemoryTx {
    async fn get_customer(&mut self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        Ok(self.staged.customers.get(&id).cloned())
    }

    async fn find_customer_by_email(
        &mut self,
        email: &str,
    ) -> Result<Option<Customer>, StoreError> {
        Ok(self
            .staged
            .customers
            .values()
            .find(|c| c.email.as_str() == email)
            .cloned())
    }

    async fn insert_customer(
        &mut self,
        record: CustomerRecord,
    ) -> Result<Customer, StoreError> {
        if self
            .staged
            .customers
            .values()
            .any(|c| c.email == record.email)
        {
            return Err(StoreError::Conflict(format!(
                "email {} already exists",
                record.email
            )));
        }

        self.staged.next_customer_id += 1;
        let customer = Customer {
            id: CustomerId::new(self.staged.next_customer_id),
            name: record.name,
            email: record.email,
            phone: record.phone,
            created_at: Utc::now(),
        };
        self.staged.customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn get_products(&mut self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.staged.products.get(id).cloned())
            .collect())
    }

    async fn insert_product(&mut self, record: ProductRecord) -> Result<Product, StoreError> {
        self.staged.next_product_id += 1;
        let product = Product {
            id: ProductId::new(self.staged.next_product_id),
            name: record.name,
            price: record.price,
            stock: record.stock,
        };
        self.staged.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn insert_order(&mut self, record: OrderRecord) -> Result<Order, StoreError> {
        // Same referential integrity the SQL schema enforces with FKs.
        if !self.staged.customers.contains_key(&record.customer_id) {
            return Err(StoreError::Conflict(format!(
                "order references missing customer {}",
                record.customer_id
            )));
        }
        for id in &record.product_ids {
            if !self.staged.products.contains_key(id) {
                return Err(StoreError::Conflict(format!(
                    "order references missing product {id}"
                )));
            }
        }

        // Associations are kept in ascending product id order, as the SQL
        // backend reads them back.
        let mut product_ids = record.product_ids;
        product_ids.sort_unstable();

        self.staged.next_order_id += 1;
        let order = Order {
            id: OrderId::new(self.staged.next_order_id),
            customer_id: record.customer_id,
            product_ids,
            total_amount: record.total_amount,
            order_date: record.order_date,
        };
        self.staged.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn restock_below(
        &mut self,
        threshold: i32,
        amount: i32,
    ) -> Result<Vec<Product>, StoreError> {
        let mut updated = Vec::new();
        for product in self.staged.products.values_mut() {
            if product.stock < threshold {
                product.stock += amount;
                updated.push(product.clone());
            }
        }
        Ok(updated)
    }

    async fn delete_customers_without_orders_since(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let active: std::collections::BTreeSet<CustomerId> = self
            .staged
            .orders
            .values()
            .filter(|o| o.order_date >= cutoff)
            .map(|o| o.customer_id)
            .collect();

        let stale: Vec<CustomerId> = self
            .staged
            .customers
            .keys()
            .filter(|id| !active.contains(id))
            .copied()
            .collect();

        for id in &stale {
            self.staged.customers.remove(id);
        }
        // Cascade: a removed customer takes their orders with them.
        self.staged.orders.retain(|_, o| !stale.contains(&o.customer_id));

        Ok(stale.len() as u64)
    }

    async fn orders_since(
        &mut self,
        since: DateTime<Utc>,
    ) -> Result<Vec<OrderReminder>, StoreError> {
        let mut reminders = Vec::new();
        for order in self.staged.orders.values() {
            if order.order_date < since {
                continue;
            }
            let email = self
                .staged
                .customers
                .get(&order.customer_id)
                .map(|c| c.email.clone())
                .ok_or_else(|| {
                    StoreError::DataCorruption(format!(
                        "order {} references missing customer {}",
                        order.id, order.customer_id
                    ))
                })?;
            reminders.push(OrderReminder {
                order_id: order.id,
                email,
            });
        }
        Ok(reminders)
    }

    async fn report_totals(&mut self) -> Result<ReportTotals, StoreError> {
        let revenue: Decimal = self.staged.orders.values().map(|o| o.total_amount).sum();
        Ok(ReportTotals {
            customers: i64::try_from(self.staged.customers.len()).unwrap_or(i64::MAX),
            orders: i64::try_from(self.staged.orders.len()).unwrap_or(i64::MAX),
            revenue,
        })
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        self.guard.tables = self.staged;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        // Dropping the staged copy is the rollback.
        Ok(())
    }
}
