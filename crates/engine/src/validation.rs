//! Pure field-level validation.
//!
//! Every function here is a total function from raw input to either a
//! validated record or a list of [`FieldError`]s - malformed input is
//! data, not an exception. Store-dependent checks (email uniqueness,
//! reference resolution) happen later, inside the mutation engine's
//! transaction.

use rust_decimal::Decimal;

use meridian_core::{CustomerRecord, Email, NewCustomer, NewOrder, NewProduct, Phone, ProductRecord};

use crate::error::FieldError;

/// Validate raw customer input into a record.
///
/// Checks: non-empty name, structurally valid email, optionally valid
/// phone. Uniqueness of the email is checked in-transaction, not here.
///
/// # Errors
///
/// Returns every failing field at once.
pub fn validate_customer(input: &NewCustomer) -> Result<CustomerRecord, Vec<FieldError>> {
    let mut errors = Vec::new();

    let name = input.name.trim();
    if name.is_empty() {
        errors.push(FieldError::new("name", "must not be empty"));
    }

    let email = match Email::parse(&input.email) {
        Ok(email) => Some(email),
        Err(e) => {
            errors.push(FieldError::new("email", e.to_string()));
            None
        }
    };

    let phone = match &input.phone {
        None => None,
        Some(raw) => match Phone::parse(raw) {
            Ok(phone) => Some(phone),
            Err(_) => {
                errors.push(FieldError::new("phone", "invalid phone format"));
                None
            }
        },
    };

    match (errors.is_empty(), email) {
        (true, Some(email)) => Ok(CustomerRecord {
            name: name.to_owned(),
            email,
            phone,
        }),
        _ => Err(errors),
    }
}

/// Validate raw product input into a record.
///
/// Checks: non-empty name, price > 0, stock >= 0 (default 0).
///
/// # Errors
///
/// Returns every failing field at once.
pub fn validate_product(input: &NewProduct) -> Result<ProductRecord, Vec<FieldError>> {
    let mut errors = Vec::new();

    let name = input.name.trim();
    if name.is_empty() {
        errors.push(FieldError::new("name", "must not be empty"));
    }

    if input.price <= Decimal::ZERO {
        errors.push(FieldError::new("price", "must be positive"));
    }

    let stock = input.stock.unwrap_or(0);
    if stock < 0 {
        errors.push(FieldError::new("stock", "cannot be negative"));
    }

    if errors.is_empty() {
        Ok(ProductRecord {
            name: name.to_owned(),
            price: input.price,
            stock,
        })
    } else {
        Err(errors)
    }
}

/// Validate the shape of raw order input.
///
/// Only the shape: the product list must be non-empty. Reference
/// resolution (customer and product existence) is transactional work.
///
/// # Errors
///
/// Returns a single error for an empty product list.
pub fn validate_order_shape(input: &NewOrder) -> Result<(), Vec<FieldError>> {
    if input.product_ids.is_empty() {
        return Err(vec![FieldError::new(
            "product_ids",
            "at least one product must be provided",
        )]);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use meridian_core::{CustomerId, ProductId};

    #[test]
    fn test_valid_customer() {
        let record = validate_customer(&NewCustomer {
            name: "  Alice Johnson  ".to_owned(),
            email: "alice@example.com".to_owned(),
            phone: Some("+1234567890".to_owned()),
        })
        .unwrap();
        assert_eq!(record.name, "Alice Johnson");
        assert_eq!(record.email.as_str(), "alice@example.com");
        assert!(record.phone.is_some());
    }

    #[test]
    fn test_customer_collects_all_errors() {
        let errors = validate_customer(&NewCustomer {
            name: "   ".to_owned(),
            email: "not-an-email".to_owned(),
            phone: Some("abc".to_owned()),
        })
        .unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["name", "email", "phone"]);
    }

    #[test]
    fn test_customer_phone_optional() {
        let record = validate_customer(&NewCustomer {
            name: "Bob".to_owned(),
            email: "bob@example.com".to_owned(),
            phone: None,
        })
        .unwrap();
        assert!(record.phone.is_none());
    }

    #[test]
    fn test_product_price_must_be_positive() {
        let errors = validate_product(&NewProduct {
            name: "Laptop".to_owned(),
            price: Decimal::ZERO,
            stock: None,
        })
        .unwrap_err();
        assert_eq!(errors.first().unwrap().field, "price");

        let errors = validate_product(&NewProduct {
            name: "Laptop".to_owned(),
            price: "-1".parse().unwrap(),
            stock: None,
        })
        .unwrap_err();
        assert_eq!(errors.first().unwrap().field, "price");
    }

    #[test]
    fn test_product_stock_defaults_to_zero() {
        let record = validate_product(&NewProduct {
            name: "Laptop".to_owned(),
            price: "999.99".parse().unwrap(),
            stock: None,
        })
        .unwrap();
        assert_eq!(record.stock, 0);
    }

    #[test]
    fn test_product_negative_stock_rejected() {
        let errors = validate_product(&NewProduct {
            name: "Laptop".to_owned(),
            price: "999.99".parse().unwrap(),
            stock: Some(-5),
        })
        .unwrap_err();
        assert_eq!(errors.first().unwrap().field, "stock");
    }

    #[test]
    fn test_order_shape_rejects_empty_products() {
        let errors = validate_order_shape(&NewOrder {
            customer_id: CustomerId::new(1),
            product_ids: vec![],
            order_date: None,
        })
        .unwrap_err();
        assert_eq!(errors.first().unwrap().field, "product_ids");

        assert!(
            validate_order_shape(&NewOrder {
                customer_id: CustomerId::new(1),
                product_ids: vec![ProductId::new(1)],
                order_date: None,
            })
            .is_ok()
        );
    }
}
