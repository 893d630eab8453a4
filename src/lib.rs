// src/lib.rs
// facturacom-cfdi - CFDI electronic invoicing for store orders
//
// Architecture:
// - Domain-centric: order and CFDI rules live in the domain
// - Event-driven: the workflow announces what happened through the event bus
// - Explicit: every provider call goes through a replaceable transport
// - Seams: orders, options, email and HTTP are traits the host can replace
// - Application Layer: thin commands over the services

// ============================================================================
// FOUNDATION
// ============================================================================

pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod events;
pub mod repositories;
pub mod services;

// ============================================================================
// APPLICATION LAYER
// ============================================================================

pub mod application;
pub mod integrations;

// ============================================================================
// PUBLIC API - Domain
// ============================================================================

pub use domain::{
    meta,
    normalize_rfc,
    validate_order_for_invoicing,
    validate_rfc,
    BillingDetails,
    CfdiArtifacts,
    CfdiEnvironment,
    CfdiRecord,
    // Results
    CfdiResult,
    InvoiceState,
    IssuedCfdi,
    LineItem,
    // Orders
    Order,
    OrderId,
    OrderStatus,
    GENERIC_PUBLIC_RFC,
};

// ============================================================================
// PUBLIC API - Errors & Configuration
// ============================================================================

pub use config::{keys, InvoicingSettings, DEFAULT_OPTIONS};
pub use error::{ApiError, AppError, AppResult, InvoiceError, InvoiceResult};

// ============================================================================
// PUBLIC API - Events
// ============================================================================

pub use events::{
    create_event_bus, register_audit_handlers, CfdiCancelled, CfdiGenerated, CfdiGenerationFailed,
    DomainEvent, EventBus, EventLogEntry, OrderCompleted,
};

// ============================================================================
// PUBLIC API - Database & Repositories
// ============================================================================

pub use db::{create_connection_pool, get_database_path, initialize_database, ConnectionPool};
pub use repositories::{
    ConfigProvider, InvoiceEventLog, InvoiceEventRecord, OrderRepository, SqliteInvoiceEventLog,
    SqliteOptionRepository, SqliteOrderRepository,
};

// ============================================================================
// PUBLIC API - Services
// ============================================================================

pub use services::{ConnectionService, ConnectionTestResult, InvoiceService, InvoiceStatus};

// ============================================================================
// PUBLIC API - Application Layer
// ============================================================================

pub use application::AppState;

pub use application::commands;
pub use application::dto;

// ============================================================================
// PUBLIC API - Integrations
// ============================================================================

pub use integrations::{
    FacturaComClient, FacturaComClientFactory, HttpTransport, InvoicingApi, InvoicingApiFactory,
    Notifier, ReqwestTransport, SqliteEmailOutbox,
};
