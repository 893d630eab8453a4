// src/domain/mod.rs
//
// Domain Root
//
// Orders are owned by the store; the invoicing domain only adds the CFDI
// metadata namespace and the invoice state derived from it.

pub mod cfdi;
pub mod order;

// Order Domain
pub use order::{
    normalize_rfc, validate_order_for_invoicing, validate_rfc, BillingDetails, LineItem, Order,
    OrderId, OrderNote, OrderStatus, GENERIC_PUBLIC_RFC,
};

// CFDI Domain
pub use cfdi::{
    meta, CfdiArtifacts, CfdiEnvironment, CfdiRecord, CfdiResult, InvoiceState, IssuedCfdi,
};

use thiserror::Error;

/// Domain-level errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Domain result type
pub type DomainResult<T> = Result<T, DomainError>;
