//! Declarative filter predicates, sorting, and cursor pagination.
//!
//! A query is a list of tagged predicates combined with an implicit logical
//! AND, a sort field with direction, and a page request. Stores translate
//! the same query model two ways: the Postgres store compiles it to SQL,
//! the in-memory store evaluates the predicates directly. Filtering always
//! happens before pagination so page counts stay correct.
//!
//! Predicates on `Customer` and `Product` are pure functions of a single
//! entity and expose [`CustomerPredicate::matches`] /
//! [`ProductPredicate::matches`]. `Order` predicates may traverse the
//! related customer and products, so their evaluation takes that context
//! ([`OrderPredicate::matches`]).

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entity::{Customer, Order, Product};
use crate::types::ProductId;

/// Default page size when the caller does not specify one.
pub const DEFAULT_PAGE_LIMIT: u32 = 50;

/// Upper bound on page size; larger requests are clamped.
pub const MAX_PAGE_LIMIT: u32 = 500;

// =============================================================================
// Predicates
// =============================================================================

/// Filter predicate over customers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CustomerPredicate {
    /// Case-insensitive substring match on name.
    NameContains(String),
    /// Case-insensitive substring match on email.
    EmailContains(String),
    /// Exact email match.
    EmailEquals(String),
    /// Created at or after the given instant.
    CreatedAtGte(DateTime<Utc>),
    /// Created at or before the given instant.
    CreatedAtLte(DateTime<Utc>),
    /// Phone number starts with the given prefix (e.g. `+1`).
    /// Customers without a phone never match.
    PhoneStartsWith(String),
}

impl CustomerPredicate {
    /// Evaluate this predicate against a customer.
    #[must_use]
    pub fn matches(&self, customer: &Customer) -> bool {
        match self {
            Self::NameContains(needle) => contains_ci(&customer.name, needle),
            Self::EmailContains(needle) => contains_ci(customer.email.as_str(), needle),
            Self::EmailEquals(email) => customer.email.as_str() == email,
            Self::CreatedAtGte(instant) => customer.created_at >= *instant,
            Self::CreatedAtLte(instant) => customer.created_at <= *instant,
            Self::PhoneStartsWith(prefix) => customer
                .phone
                .as_ref()
                .is_some_and(|p| p.as_str().starts_with(prefix)),
        }
    }
}

/// Filter predicate over products.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProductPredicate {
    /// Case-insensitive substring match on name.
    NameContains(String),
    /// Price greater than or equal.
    PriceGte(Decimal),
    /// Price less than or equal.
    PriceLte(Decimal),
    /// Stock greater than or equal.
    StockGte(i32),
    /// Stock less than or equal.
    StockLte(i32),
}

impl ProductPredicate {
    /// Evaluate this predicate against a product.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        match self {
            Self::NameContains(needle) => contains_ci(&product.name, needle),
            Self::PriceGte(price) => product.price >= *price,
            Self::PriceLte(price) => product.price <= *price,
            Self::StockGte(stock) => product.stock >= *stock,
            Self::StockLte(stock) => product.stock <= *stock,
        }
    }
}

/// Filter predicate over orders.
///
/// `CustomerNameContains` and `ProductNameContains` traverse relationships;
/// stores must apply them with a join (or equivalent) before pagination,
/// never as an in-memory post-filter of a fetched page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderPredicate {
    /// Total greater than or equal.
    TotalAmountGte(Decimal),
    /// Total less than or equal.
    TotalAmountLte(Decimal),
    /// Placed at or after the given instant.
    OrderDateGte(DateTime<Utc>),
    /// Placed at or before the given instant.
    OrderDateLte(DateTime<Utc>),
    /// Case-insensitive substring match on the related customer's name.
    CustomerNameContains(String),
    /// Case-insensitive substring match on any related product's name.
    ProductNameContains(String),
    /// Order includes the given product.
    ProductIdEquals(ProductId),
}

impl OrderPredicate {
    /// Evaluate this predicate against an order and its related context.
    ///
    /// `customer_name` is the name of the order's customer; `product_names`
    /// are the names of every product on the order, in any order.
    #[must_use]
    pub fn matches(&self, order: &Order, customer_name: &str, product_names: &[&str]) -> bool {
        match self {
            Self::TotalAmountGte(total) => order.total_amount >= *total,
            Self::TotalAmountLte(total) => order.total_amount <= *total,
            Self::OrderDateGte(instant) => order.order_date >= *instant,
            Self::OrderDateLte(instant) => order.order_date <= *instant,
            Self::CustomerNameContains(needle) => contains_ci(customer_name, needle),
            Self::ProductNameContains(needle) => {
                product_names.iter().any(|name| contains_ci(name, needle))
            }
            Self::ProductIdEquals(id) => order.product_ids.contains(id),
        }
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

// =============================================================================
// Sorting
// =============================================================================

/// Sortable customer fields.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum CustomerSortField {
    /// Store-assigned ID (insertion order).
    #[default]
    Id,
    /// Display name.
    Name,
    /// Email address.
    Email,
    /// Creation timestamp.
    CreatedAt,
}

/// Sortable product fields.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProductSortField {
    /// Store-assigned ID (insertion order).
    #[default]
    Id,
    /// Display name.
    Name,
    /// Unit price.
    Price,
    /// Units on hand.
    Stock,
}

/// Sortable order fields.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderSortField {
    /// Store-assigned ID (insertion order).
    #[default]
    Id,
    /// Order date.
    OrderDate,
    /// Order total.
    TotalAmount,
}

/// A sort specification: field plus direction.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sort<F> {
    /// Field to sort by.
    pub field: F,
    /// Sort descending instead of ascending.
    pub descending: bool,
}

impl<F> Sort<F> {
    /// Ascending sort on the given field.
    pub const fn asc(field: F) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    /// Descending sort on the given field.
    pub const fn desc(field: F) -> Self {
        Self {
            field,
            descending: true,
        }
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Errors raised while decoding a pagination cursor.
#[derive(thiserror::Error, Debug, Clone)]
pub enum CursorError {
    /// The cursor is not valid base64 or not ours.
    #[error("malformed cursor")]
    Malformed,
}

/// An opaque continuation cursor.
///
/// Internally a versioned, base64-encoded offset into the filtered, sorted
/// result set. Clients must treat it as opaque; the format may change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Encode a cursor pointing at the given offset.
    #[must_use]
    pub fn encode(offset: u64) -> Self {
        Self(URL_SAFE_NO_PAD.encode(format!("v1:{offset}")))
    }

    /// Decode a cursor back into an offset.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::Malformed`] if the cursor was not produced by
    /// [`Cursor::encode`].
    pub fn decode(&self) -> Result<u64, CursorError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(&self.0)
            .map_err(|_| CursorError::Malformed)?;
        let text = String::from_utf8(bytes).map_err(|_| CursorError::Malformed)?;
        let offset = text.strip_prefix("v1:").ok_or(CursorError::Malformed)?;
        offset.parse().map_err(|_| CursorError::Malformed)
    }

    /// The raw cursor string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Cursor {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A page request: continuation cursor plus limit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageRequest {
    /// Resume after this cursor; `None` starts from the beginning.
    pub after: Option<Cursor>,
    /// Maximum number of items to return.
    pub limit: u32,
}

impl PageRequest {
    /// The first page with the given limit.
    #[must_use]
    pub const fn first(limit: u32) -> Self {
        Self { after: None, limit }
    }

    /// The page following the given cursor.
    #[must_use]
    pub const fn after(cursor: Cursor, limit: u32) -> Self {
        Self {
            after: Some(cursor),
            limit,
        }
    }

    /// Resolve the starting offset from the cursor, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::Malformed`] for a cursor we did not produce.
    pub fn offset(&self) -> Result<u64, CursorError> {
        self.after.as_ref().map_or(Ok(0), Cursor::decode)
    }

    /// The limit clamped to `1..=MAX_PAGE_LIMIT`.
    #[must_use]
    pub fn clamped_limit(&self) -> u32 {
        self.limit.clamp(1, MAX_PAGE_LIMIT)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_LIMIT)
    }
}

/// An ordered, paginated result set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page, in sort order.
    pub items: Vec<T>,
    /// Cursor continuing after the last item, if more remain.
    pub end_cursor: Option<Cursor>,
    /// Whether another page exists.
    pub has_next: bool,
}

impl<T> Page<T> {
    /// An empty page with no continuation.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            end_cursor: None,
            has_next: false,
        }
    }

    /// Build a page from the filtered, sorted slice of the result set.
    ///
    /// `items` must hold at most `limit + 1` items starting at `offset`;
    /// the extra item, when present, signals a following page and is
    /// dropped from the output.
    #[must_use]
    pub fn from_window(mut items: Vec<T>, offset: u64, limit: u32) -> Self {
        let limit = limit as usize;
        let has_next = items.len() > limit;
        items.truncate(limit);
        let end_cursor = if has_next {
            Some(Cursor::encode(offset + items.len() as u64))
        } else {
            None
        };
        Self {
            items,
            end_cursor,
            has_next,
        }
    }
}

// =============================================================================
// Per-entity query specs
// =============================================================================

/// A complete customer query: AND-combined predicates, sort, page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomerQuery {
    /// Predicates, combined with logical AND.
    pub predicates: Vec<CustomerPredicate>,
    /// Sort specification.
    pub sort: Sort<CustomerSortField>,
    /// Page request.
    #[serde(default)]
    pub page: PageRequest,
}

/// A complete product query: AND-combined predicates, sort, page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductQuery {
    /// Predicates, combined with logical AND.
    pub predicates: Vec<ProductPredicate>,
    /// Sort specification.
    pub sort: Sort<ProductSortField>,
    /// Page request.
    #[serde(default)]
    pub page: PageRequest,
}

/// A complete order query: AND-combined predicates, sort, page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderQuery {
    /// Predicates, combined with logical AND.
    pub predicates: Vec<OrderPredicate>,
    /// Sort specification.
    pub sort: Sort<OrderSortField>,
    /// Page request.
    #[serde(default)]
    pub page: PageRequest,
}
