// src/services/mod.rs
//
// Services Module - Orchestration Layer

pub mod connection_service;
pub mod invoice_service;


pub use connection_service::{ConnectionService, ConnectionTestResult};
pub use invoice_service::{InvoiceService, InvoiceStatus};
