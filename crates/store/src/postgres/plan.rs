//! Query plan builder: compiles the declarative filter model to SQL.
//!
//! Each predicate variant maps to one SQL condition appended to a
//! [`QueryBuilder`], AND-combined. Relationship predicates on orders
//! compile to `EXISTS` subqueries so the row set stays one-row-per-order
//! and pagination counts stay correct.
//!
//! All user-supplied values go through bind parameters; substring and
//! prefix matches additionally escape LIKE metacharacters.

use sqlx::{Postgres, QueryBuilder};

use meridian_core::{
    CustomerPredicate, CustomerSortField, OrderPredicate, OrderSortField, ProductPredicate,
    ProductSortField, Sort,
};

/// Escape `%`, `_`, and `\` so a user value matches literally inside a
/// LIKE/ILIKE pattern.
pub(crate) fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn contains_pattern(value: &str) -> String {
    format!("%{}%", escape_like(value))
}

fn prefix_pattern(value: &str) -> String {
    format!("{}%", escape_like(value))
}

/// Writes `" WHERE "` before the first condition and `" AND "` before the
/// rest.
struct Conjunction {
    first: bool,
}

impl Conjunction {
    const fn new() -> Self {
        Self { first: true }
    }

    fn push(&mut self, qb: &mut QueryBuilder<'_, Postgres>) {
        if self.first {
            qb.push(" WHERE ");
            self.first = false;
        } else {
            qb.push(" AND ");
        }
    }
}

pub(crate) fn push_customer_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    predicates: &[CustomerPredicate],
) {
    let mut conj = Conjunction::new();
    for predicate in predicates {
        conj.push(qb);
        match predicate {
            CustomerPredicate::NameContains(needle) => {
                qb.push("name ILIKE ").push_bind(contains_pattern(needle));
            }
            CustomerPredicate::EmailContains(needle) => {
                qb.push("email ILIKE ").push_bind(contains_pattern(needle));
            }
            CustomerPredicate::EmailEquals(email) => {
                qb.push("email = ").push_bind(email.clone());
            }
            CustomerPredicate::CreatedAtGte(instant) => {
                qb.push("created_at >= ").push_bind(*instant);
            }
            CustomerPredicate::CreatedAtLte(instant) => {
                qb.push("created_at <= ").push_bind(*instant);
            }
            CustomerPredicate::PhoneStartsWith(prefix) => {
                qb.push("phone LIKE ").push_bind(prefix_pattern(prefix));
            }
        }
    }
}

pub(crate) fn push_product_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    predicates: &[ProductPredicate],
) {
    let mut conj = Conjunction::new();
    for predicate in predicates {
        conj.push(qb);
        match predicate {
            ProductPredicate::NameContains(needle) => {
                qb.push("name ILIKE ").push_bind(contains_pattern(needle));
            }
            ProductPredicate::PriceGte(price) => {
                qb.push("price >= ").push_bind(*price);
            }
            ProductPredicate::PriceLte(price) => {
                qb.push("price <= ").push_bind(*price);
            }
            ProductPredicate::StockGte(stock) => {
                qb.push("stock >= ").push_bind(*stock);
            }
            ProductPredicate::StockLte(stock) => {
                qb.push("stock <= ").push_bind(*stock);
            }
        }
    }
}

pub(crate) fn push_order_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    predicates: &[OrderPredicate],
) {
    let mut conj = Conjunction::new();
    for predicate in predicates {
        conj.push(qb);
        match predicate {
            OrderPredicate::TotalAmountGte(total) => {
                qb.push("o.total_amount >= ").push_bind(*total);
            }
            OrderPredicate::TotalAmountLte(total) => {
                qb.push("o.total_amount <= ").push_bind(*total);
            }
            OrderPredicate::OrderDateGte(instant) => {
                qb.push("o.order_date >= ").push_bind(*instant);
            }
            OrderPredicate::OrderDateLte(instant) => {
                qb.push("o.order_date <= ").push_bind(*instant);
            }
            OrderPredicate::CustomerNameContains(needle) => {
                qb.push("c.name ILIKE ").push_bind(contains_pattern(needle));
            }
            OrderPredicate::ProductNameContains(needle) => {
                qb.push(
                    "EXISTS (SELECT 1 FROM order_product op2 \
                     JOIN product p ON p.id = op2.product_id \
                     WHERE op2.order_id = o.id AND p.name ILIKE ",
                )
                .push_bind(contains_pattern(needle))
                .push(")");
            }
            OrderPredicate::ProductIdEquals(id) => {
                qb.push(
                    "EXISTS (SELECT 1 FROM order_product op2 \
                     WHERE op2.order_id = o.id AND op2.product_id = ",
                )
                .push_bind(id.as_i32())
                .push(")");
            }
        }
    }
}

fn direction(descending: bool) -> &'static str {
    if descending { "DESC" } else { "ASC" }
}

pub(crate) fn push_customer_sort(
    qb: &mut QueryBuilder<'_, Postgres>,
    sort: Sort<CustomerSortField>,
) {
    let column = match sort.field {
        CustomerSortField::Id => "id",
        CustomerSortField::Name => "name",
        CustomerSortField::Email => "email",
        CustomerSortField::CreatedAt => "created_at",
    };
    let dir = direction(sort.descending);
    // ID tie-break keeps the order total, so pages never overlap.
    qb.push(format!(" ORDER BY {column} {dir}, id {dir}"));
}

pub(crate) fn push_product_sort(qb: &mut QueryBuilder<'_, Postgres>, sort: Sort<ProductSortField>) {
    let column = match sort.field {
        ProductSortField::Id => "id",
        ProductSortField::Name => "name",
        ProductSortField::Price => "price",
        ProductSortField::Stock => "stock",
    };
    let dir = direction(sort.descending);
    qb.push(format!(" ORDER BY {column} {dir}, id {dir}"));
}

pub(crate) fn push_order_sort(qb: &mut QueryBuilder<'_, Postgres>, sort: Sort<OrderSortField>) {
    let column = match sort.field {
        OrderSortField::Id => "o.id",
        OrderSortField::OrderDate => "o.order_date",
        OrderSortField::TotalAmount => "o.total_amount",
    };
    let dir = direction(sort.descending);
    qb.push(format!(" ORDER BY {column} {dir}, o.id {dir}"));
}

/// Append `LIMIT`/`OFFSET`. The limit passed here should already include
/// the extra look-ahead row the pagination window uses.
pub(crate) fn push_page(qb: &mut QueryBuilder<'_, Postgres>, limit: i64, offset: i64) {
    qb.push(" LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use meridian_core::ProductId;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_customer_filters_sql() {
        let mut qb = QueryBuilder::new("SELECT * FROM customer");
        push_customer_filters(
            &mut qb,
            &[
                CustomerPredicate::NameContains("ali".to_owned()),
                CustomerPredicate::PhoneStartsWith("+1".to_owned()),
            ],
        );
        let sql = qb.sql();
        assert!(sql.contains("WHERE name ILIKE $1"));
        assert!(sql.contains("AND phone LIKE $2"));
    }

    #[test]
    fn test_no_predicates_means_no_where() {
        let mut qb = QueryBuilder::new("SELECT * FROM product");
        push_product_filters(&mut qb, &[]);
        assert!(!qb.sql().contains("WHERE"));
    }

    #[test]
    fn test_product_range_and_sort_sql() {
        let mut qb = QueryBuilder::new("SELECT * FROM product");
        push_product_filters(
            &mut qb,
            &[
                ProductPredicate::PriceGte("100".parse().unwrap()),
                ProductPredicate::PriceLte("1000".parse().unwrap()),
            ],
        );
        push_product_sort(&mut qb, Sort::desc(ProductSortField::Stock));
        push_page(&mut qb, 51, 0);
        let sql = qb.sql();
        assert!(sql.contains("WHERE price >= $1 AND price <= $2"));
        assert!(sql.contains("ORDER BY stock DESC, id DESC"));
        assert!(sql.contains("LIMIT $3 OFFSET $4"));
    }

    #[test]
    fn test_order_relationship_filters_use_exists() {
        let mut qb = QueryBuilder::new("SELECT * FROM orders o JOIN customer c ON c.id = o.customer_id");
        push_order_filters(
            &mut qb,
            &[
                OrderPredicate::CustomerNameContains("alice".to_owned()),
                OrderPredicate::ProductNameContains("laptop".to_owned()),
                OrderPredicate::ProductIdEquals(ProductId::new(3)),
            ],
        );
        let sql = qb.sql();
        assert!(sql.contains("c.name ILIKE $1"));
        assert!(sql.contains("EXISTS (SELECT 1 FROM order_product op2"));
        assert!(sql.contains("p.name ILIKE $2"));
        assert!(sql.contains("op2.product_id = $3"));
    }
}
