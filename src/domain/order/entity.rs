use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Store-assigned order identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for OrderId {
    fn from(value: i64) -> Self {
        OrderId(value)
    }
}

/// A store order as seen by the invoicing workflow.
///
/// The order is owned by the store platform. The workflow only reads billing
/// data and line items, and writes into the `cfdi_*` metadata namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,

    pub status: OrderStatus,

    /// Customer billing data (name, email, RFC)
    pub billing: BillingDetails,

    pub items: Vec<LineItem>,

    /// Free-form string metadata, persisted as key/value rows
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,

    /// Append-only human readable history
    #[serde(default)]
    pub notes: Vec<OrderNote>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillingDetails {
    pub name: String,
    pub email: Option<String>,
    /// Mexican taxpayer id, upper-cased on input
    pub rfc: Option<String>,
    pub postal_code: Option<String>,
    /// SAT fiscal regime code of the receiver (e.g. "616")
    pub tax_regime: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: f64,
    /// Price per unit before VAT
    pub unit_price: f64,
    pub sku: Option<String>,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: f64, unit_price: f64) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
            sku: None,
        }
    }

    pub fn subtotal(&self) -> f64 {
        self.quantity * self.unit_price
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderNote {
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
    Refunded,
}

impl Order {
    pub fn new(id: OrderId, billing: BillingDetails, items: Vec<LineItem>) -> Self {
        Self {
            id,
            status: OrderStatus::Pending,
            billing,
            items,
            metadata: BTreeMap::new(),
            notes: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Metadata value, treating empty strings as absent
    pub fn get_meta(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn set_meta(&mut self, key: &str, value: impl Into<String>) {
        self.metadata.insert(key.to_string(), value.into());
    }

    pub fn remove_meta(&mut self, key: &str) -> Option<String> {
        self.metadata.remove(key)
    }

    pub fn total(&self) -> f64 {
        self.items.iter().map(LineItem::subtotal).sum()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Processing => write!(f, "processing"),
            OrderStatus::Completed => write!(f, "completed"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
            OrderStatus::Refunded => write!(f, "refunded"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "refunded" => Ok(OrderStatus::Refunded),
            other => Err(format!("unknown order status '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_meta_reads_as_absent() {
        let mut order = Order::new(OrderId(1), BillingDetails::default(), Vec::new());
        order.set_meta("cfdi_uuid", "");
        assert_eq!(order.get_meta("cfdi_uuid"), None);

        order.set_meta("cfdi_uuid", "abc");
        assert_eq!(order.get_meta("cfdi_uuid"), Some("abc"));
    }

    #[test]
    fn test_order_total() {
        let order = Order::new(
            OrderId(7),
            BillingDetails::default(),
            vec![LineItem::new("Mug", 2.0, 150.0), LineItem::new("Shipping", 1.0, 99.5)],
        );
        assert!((order.total() - 399.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_status_roundtrips_through_text() {
        for status in [OrderStatus::Pending, OrderStatus::Completed, OrderStatus::Refunded] {
            let parsed: OrderStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }
}
