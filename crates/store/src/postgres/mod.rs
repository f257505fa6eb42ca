//! `PostgreSQL` store implementation.
//!
//! One sqlx transaction per [`StoreTx`]; queries are assembled at runtime
//! with [`sqlx::QueryBuilder`] by the [`plan`] module. Rows come back as
//! internal row structs and convert into domain types via `TryFrom`, so
//! invalid stored data surfaces as [`StoreError::DataCorruption`] instead
//! of panicking.
//!
//! # Schema
//!
//! Migrations live in `crates/store/migrations/` and are embedded in the
//! binary via [`MIGRATOR`]:
//!
//! - `customer` - id serial, name, email (unique), phone, created_at
//! - `product` - id serial, name, price numeric (> 0), stock int (>= 0)
//! - `orders` - id serial, customer_id FK (ON DELETE CASCADE),
//!   total_amount numeric, order_date
//! - `order_product` - join table, cascades with its order
//!
//! The cascade on `orders.customer_id` is the deliberate policy behind
//! stale-customer cleanup: deleting a customer removes their orders.

mod plan;

use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::warn;

use meridian_core::{
    Customer, CustomerId, CustomerQuery, CustomerRecord, Email, Order, OrderId, OrderQuery,
    OrderRecord, OrderReminder, Page, PageRequest, Phone, Product, ProductId, ProductQuery,
    ProductRecord, ReportTotals,
};

use crate::{Store, StoreError, StoreTx};

/// Embedded schema migrations (`crates/store/migrations/`).
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for customer queries.
#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: i32,
    name: String,
    email: String,
    phone: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = StoreError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            warn!(customer_id = row.id, "stored email failed validation: {e}");
            StoreError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let phone = row
            .phone
            .as_deref()
            .map(Phone::parse)
            .transpose()
            .map_err(|e| {
                warn!(customer_id = row.id, "stored phone failed validation: {e}");
                StoreError::DataCorruption(format!("invalid phone in database: {e}"))
            })?;

        Ok(Self {
            id: CustomerId::new(row.id),
            name: row.name,
            email,
            phone,
            created_at: row.created_at,
        })
    }
}

/// Internal row type for product queries.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    price: Decimal,
    stock: i32,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            price: row.price,
            stock: row.stock,
        }
    }
}

/// Internal row type for order queries, with aggregated product IDs.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    customer_id: i32,
    total_amount: Decimal,
    order_date: DateTime<Utc>,
    product_ids: Vec<i32>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: OrderId::new(row.id),
            customer_id: CustomerId::new(row.customer_id),
            product_ids: row.product_ids.into_iter().map(ProductId::new).collect(),
            total_amount: row.total_amount,
            order_date: row.order_date,
        }
    }
}

/// Internal row type for reminder queries.
#[derive(Debug, sqlx::FromRow)]
struct ReminderRow {
    id: i32,
    email: String,
}

/// Internal row type for the aggregate report.
#[derive(Debug, sqlx::FromRow)]
struct ReportRow {
    customers: i64,
    orders: i64,
    revenue: Decimal,
}

const ORDER_SELECT: &str = "SELECT o.id, o.customer_id, o.total_amount, o.order_date, \
     array_agg(op.product_id ORDER BY op.product_id) AS product_ids \
     FROM orders o \
     JOIN customer c ON c.id = o.customer_id \
     JOIN order_product op ON op.order_id = o.id";

const ORDER_GROUP_BY: &str = " GROUP BY o.id, o.customer_id, o.total_amount, o.order_date";

fn page_window(page: &PageRequest) -> Result<(u64, u32, i64, i64), StoreError> {
    let offset = page.offset()?;
    let limit = page.clamped_limit();
    let sql_offset = i64::try_from(offset)
        .map_err(|_| StoreError::InvalidCursor(meridian_core::CursorError::Malformed))?;
    Ok((offset, limit, i64::from(limit) + 1, sql_offset))
}

fn map_insert_error(error: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &error {
        if db.is_unique_violation() {
            return StoreError::Conflict(db.message().to_owned());
        }
        if db.is_foreign_key_violation() {
            return StoreError::Conflict(db.message().to_owned());
        }
    }
    StoreError::Database(error)
}

// =============================================================================
// Store
// =============================================================================

/// A [`Store`] backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Store for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(PgTx { tx })
    }

    async fn list_customers(
        &self,
        query: &CustomerQuery,
    ) -> Result<Page<Customer>, StoreError> {
        let (offset, limit, fetch, sql_offset) = page_window(&query.page)?;

        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT id, name, email, phone, created_at FROM customer");
        plan::push_customer_filters(&mut qb, &query.predicates);
        plan::push_customer_sort(&mut qb, query.sort);
        plan::push_page(&mut qb, fetch, sql_offset);

        let rows: Vec<CustomerRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        let items = rows
            .into_iter()
            .map(Customer::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::from_window(items, offset, limit))
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>, StoreError> {
        let (offset, limit, fetch, sql_offset) = page_window(&query.page)?;

        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT id, name, price, stock FROM product");
        plan::push_product_filters(&mut qb, &query.predicates);
        plan::push_product_sort(&mut qb, query.sort);
        plan::push_page(&mut qb, fetch, sql_offset);

        let rows: Vec<ProductRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        let items = rows.into_iter().map(Product::from).collect();
        Ok(Page::from_window(items, offset, limit))
    }

    async fn list_orders(&self, query: &OrderQuery) -> Result<Page<Order>, StoreError> {
        let (offset, limit, fetch, sql_offset) = page_window(&query.page)?;

        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(ORDER_SELECT);
        plan::push_order_filters(&mut qb, &query.predicates);
        qb.push(ORDER_GROUP_BY);
        plan::push_order_sort(&mut qb, query.sort);
        plan::push_page(&mut qb, fetch, sql_offset);

        let rows: Vec<OrderRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        let items = rows.into_iter().map(Order::from).collect();
        Ok(Page::from_window(items, offset, limit))
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A transaction over the `PostgreSQL` store.
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

impl StoreTx for PgTx {
    async fn get_customer(&mut self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        let row: Option<CustomerRow> = sqlx::query_as(
            "SELECT id, name, email, phone, created_at FROM customer WHERE id = $1",
        )
        .bind(id.as_i32())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(Customer::try_from).transpose()
    }

    async fn find_customer_by_email(
        &mut self,
        email: &str,
    ) -> Result<Option<Customer>, StoreError> {
        let row: Option<CustomerRow> = sqlx::query_as(
            "SELECT id, name, email, phone, created_at FROM customer WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(Customer::try_from).transpose()
    }

    async fn insert_customer(
        &mut self,
        record: CustomerRecord,
    ) -> Result<Customer, StoreError> {
        let row: CustomerRow = sqlx::query_as(
            "INSERT INTO customer (name, email, phone) VALUES ($1, $2, $3) \
             RETURNING id, name, email, phone, created_at",
        )
        .bind(&record.name)
        .bind(record.email.as_str())
        .bind(record.phone.as_ref().map(Phone::as_str))
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_insert_error)?;
        Customer::try_from(row)
    }

    async fn get_products(&mut self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        let raw_ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let rows: Vec<ProductRow> =
            sqlx::query_as("SELECT id, name, price, stock FROM product WHERE id = ANY($1)")
                .bind(&raw_ids)
                .fetch_all(&mut *self.tx)
                .await?;
        let mut by_id: std::collections::HashMap<i32, Product> =
            rows.into_iter().map(|r| (r.id, Product::from(r))).collect();
        // Preserve the caller's input order.
        Ok(raw_ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn insert_product(&mut self, record: ProductRecord) -> Result<Product, StoreError> {
        let row: ProductRow = sqlx::query_as(
            "INSERT INTO product (name, price, stock) VALUES ($1, $2, $3) \
             RETURNING id, name, price, stock",
        )
        .bind(&record.name)
        .bind(record.price)
        .bind(record.stock)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_insert_error)?;
        Ok(Product::from(row))
    }

    async fn insert_order(&mut self, record: OrderRecord) -> Result<Order, StoreError> {
        #[derive(sqlx::FromRow)]
        struct InsertedOrder {
            id: i32,
        }

        let inserted: InsertedOrder = sqlx::query_as(
            "INSERT INTO orders (customer_id, total_amount, order_date) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(record.customer_id.as_i32())
        .bind(record.total_amount)
        .bind(record.order_date)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_insert_error)?;

        // Associations are kept in ascending product id order, matching the
        // `array_agg(... ORDER BY product_id)` read path.
        let mut product_ids = record.product_ids;
        product_ids.sort_unstable();

        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("INSERT INTO order_product (order_id, product_id) ");
        qb.push_values(&product_ids, |mut row, product_id| {
            row.push_bind(inserted.id).push_bind(product_id.as_i32());
        });
        qb.build()
            .execute(&mut *self.tx)
            .await
            .map_err(map_insert_error)?;

        Ok(Order {
            id: OrderId::new(inserted.id),
            customer_id: record.customer_id,
            product_ids,
            total_amount: record.total_amount,
            order_date: record.order_date,
        })
    }

    async fn restock_below(
        &mut self,
        threshold: i32,
        amount: i32,
    ) -> Result<Vec<Product>, StoreError> {
        let rows: Vec<ProductRow> = sqlx::query_as(
            "UPDATE product SET stock = stock + $1 WHERE stock < $2 \
             RETURNING id, name, price, stock",
        )
        .bind(amount)
        .bind(threshold)
        .fetch_all(&mut *self.tx)
        .await?;
        let mut products: Vec<Product> = rows.into_iter().map(Product::from).collect();
        products.sort_by_key(|p| p.id);
        Ok(products)
    }

    async fn delete_customers_without_orders_since(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        // Candidate selection and delete in one statement: a customer who
        // gains a qualifying order cannot slip between the two.
        let result = sqlx::query(
            "DELETE FROM customer WHERE id NOT IN \
             (SELECT customer_id FROM orders WHERE order_date >= $1)",
        )
        .bind(cutoff)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn orders_since(
        &mut self,
        since: DateTime<Utc>,
    ) -> Result<Vec<OrderReminder>, StoreError> {
        let rows: Vec<ReminderRow> = sqlx::query_as(
            "SELECT o.id, c.email FROM orders o \
             JOIN customer c ON c.id = o.customer_id \
             WHERE o.order_date >= $1 ORDER BY o.id",
        )
        .bind(since)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter()
            .map(|row| {
                let email = Email::parse(&row.email).map_err(|e| {
                    warn!(order_id = row.id, "stored email failed validation: {e}");
                    StoreError::DataCorruption(format!("invalid email in database: {e}"))
                })?;
                Ok(OrderReminder {
                    order_id: OrderId::new(row.id),
                    email,
                })
            })
            .collect()
    }

    async fn report_totals(&mut self) -> Result<ReportTotals, StoreError> {
        let row: ReportRow = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM customer) AS customers, \
                    (SELECT COUNT(*) FROM orders) AS orders, \
                    COALESCE((SELECT SUM(total_amount) FROM orders), 0) AS revenue",
        )
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(ReportTotals {
            customers: row.customers,
            orders: row.orders,
            revenue: row.revenue,
        })
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_row_with_bad_email_is_data_corruption() {
        let row = CustomerRow {
            id: 7,
            name: "Alice Johnson".to_owned(),
            email: "not-an-email".to_owned(),
            phone: None,
            created_at: Utc::now(),
        };

        let err = Customer::try_from(row).unwrap_err();
        assert!(matches!(err, StoreError::DataCorruption(_)));
    }

    #[test]
    fn test_customer_row_with_bad_phone_is_data_corruption() {
        let row = CustomerRow {
            id: 7,
            name: "Alice Johnson".to_owned(),
            email: "alice@example.com".to_owned(),
            phone: Some("not a phone".to_owned()),
            created_at: Utc::now(),
        };

        let err = Customer::try_from(row).unwrap_err();
        assert!(matches!(err, StoreError::DataCorruption(_)));
    }
}
