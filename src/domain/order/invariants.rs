use super::entity::Order;
use crate::domain::{DomainError, DomainResult};
use regex::Regex;
use std::sync::OnceLock;

/// Generic RFC for sales to the general public
pub const GENERIC_PUBLIC_RFC: &str = "XAXX010101000";

fn rfc_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // 3 letters (legal person) or 4 letters (individual), birth/creation
    // date as YYMMDD, then a 3 character homoclave.
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z&Ñ]{3,4}[0-9]{6}[A-Z0-9]{3}$").expect("valid RFC regex"))
}

/// Upper-cases and trims an RFC as typed by a customer
pub fn normalize_rfc(rfc: &str) -> String {
    rfc.trim().to_uppercase()
}

/// Checks the shape of an RFC (not its registration with the SAT)
pub fn validate_rfc(rfc: &str) -> DomainResult<()> {
    let rfc = normalize_rfc(rfc);
    if rfc.is_empty() {
        return Err(DomainError::Validation("customer RFC is missing".to_string()));
    }
    if !rfc_pattern().is_match(&rfc) {
        return Err(DomainError::Validation(format!(
            "RFC '{}' is not a valid format (expected e.g. {})",
            rfc, GENERIC_PUBLIC_RFC
        )));
    }
    Ok(())
}

/// Validates that an order carries everything a CFDI needs
pub fn validate_order_for_invoicing(order: &Order) -> DomainResult<()> {
    match order.billing.rfc.as_deref() {
        Some(rfc) => validate_rfc(rfc)?,
        None => {
            return Err(DomainError::Validation(
                "customer RFC is missing".to_string(),
            ))
        }
    }
    validate_items(order)
}

fn validate_items(order: &Order) -> DomainResult<()> {
    if order.items.is_empty() {
        return Err(DomainError::Validation(
            "order has no line items".to_string(),
        ));
    }
    for item in &order.items {
        if !(item.quantity.is_finite() && item.quantity > 0.0) {
            return Err(DomainError::Validation(format!(
                "line item '{}' has invalid quantity {}",
                item.description, item.quantity
            )));
        }
        if !(item.unit_price.is_finite() && item.unit_price >= 0.0) {
            return Err(DomainError::Validation(format!(
                "line item '{}' has invalid price {}",
                item.description, item.unit_price
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{BillingDetails, LineItem, OrderId};

    fn billed_order(rfc: Option<&str>, items: Vec<LineItem>) -> Order {
        let billing = BillingDetails {
            name: "Ana López".to_string(),
            rfc: rfc.map(str::to_string),
            ..Default::default()
        };
        Order::new(OrderId(1), billing, items)
    }

    #[test]
    fn test_valid_rfcs() {
        assert!(validate_rfc("XAXX010101000").is_ok());
        assert!(validate_rfc("gode561231gr8").is_ok());
        // legal person, 12 chars
        assert!(validate_rfc("ABC010203XY1").is_ok());
        assert!(validate_rfc("ÑAB010203XY1").is_ok());
    }

    #[test]
    fn test_invalid_rfcs() {
        assert!(validate_rfc("").is_err());
        assert!(validate_rfc("XAXX01010100").is_err());
        assert!(validate_rfc("12345678901234").is_err());
        assert!(validate_rfc("XAXX0101010000").is_err());
    }

    #[test]
    fn test_order_without_rfc_fails() {
        let order = billed_order(None, vec![LineItem::new("Mug", 1.0, 100.0)]);
        assert!(validate_order_for_invoicing(&order).is_err());
    }

    #[test]
    fn test_order_without_items_fails() {
        let order = billed_order(Some("XAXX010101000"), Vec::new());
        let err = validate_order_for_invoicing(&order).unwrap_err();
        assert!(err.to_string().contains("no line items"));
    }

    #[test]
    fn test_non_finite_amounts_fail() {
        for (quantity, price) in [(f64::NAN, 100.0), (1.0, f64::NAN), (f64::INFINITY, 1.0)] {
            let order = billed_order(
                Some("XAXX010101000"),
                vec![LineItem::new("Mug", quantity, price)],
            );
            assert!(
                validate_order_for_invoicing(&order).is_err(),
                "accepted quantity {} price {}",
                quantity,
                price
            );
        }
    }

    #[test]
    fn test_zero_quantity_fails() {
        let order = billed_order(Some("XAXX010101000"), vec![LineItem::new("Mug", 0.0, 100.0)]);
        assert!(validate_order_for_invoicing(&order).is_err());
    }

    #[test]
    fn test_complete_order_passes() {
        let order = billed_order(Some("XAXX010101000"), vec![LineItem::new("Mug", 1.0, 100.0)]);
        assert!(validate_order_for_invoicing(&order).is_ok());
    }
}
