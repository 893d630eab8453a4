// src/repositories/mod.rs
//
// Repository layer
//
// CRITICAL RULES:
// - Repositories are DUMB data mappers
// - NO business logic
// - NO invoice state decisions
// - Explicit SQL only

pub mod invoice_event_repository;
pub mod option_repository;
pub mod order_repository;

pub use invoice_event_repository::{InvoiceEventLog, InvoiceEventRecord, SqliteInvoiceEventLog};
pub use option_repository::{ConfigProvider, SqliteOptionRepository};
pub use order_repository::{MetaExpectation, OrderRepository, SqliteOrderRepository};
