pub mod entity;
pub mod invariants;

pub use entity::{BillingDetails, LineItem, Order, OrderId, OrderNote, OrderStatus};
pub use invariants::{normalize_rfc, validate_order_for_invoicing, validate_rfc, GENERIC_PUBLIC_RFC};
