// src/application/state.rs

use std::sync::Arc;

use crate::config::DEFAULT_OPTIONS;
use crate::db::ConnectionPool;
use crate::error::AppResult;
use crate::events::{register_audit_handlers, EventBus};
use crate::integrations::facturacom::{FacturaComClientFactory, HttpTransport, InvoicingApiFactory};
use crate::integrations::mail::{Notifier, SqliteEmailOutbox};
use crate::repositories::{
    ConfigProvider, InvoiceEventLog, OrderRepository, SqliteInvoiceEventLog,
    SqliteOptionRepository, SqliteOrderRepository,
};
use crate::services::{ConnectionService, InvoiceService};

/// Everything a command needs, shared behind `Arc`s
pub struct AppState {
    pub event_bus: Arc<EventBus>,
    pub orders: Arc<dyn OrderRepository>,
    pub options: Arc<SqliteOptionRepository>,
    pub outbox: Arc<SqliteEmailOutbox>,
    pub history: Arc<dyn InvoiceEventLog>,
    pub invoice_service: Arc<InvoiceService>,
    pub connection_service: Arc<ConnectionService>,
}

impl AppState {
    /// Wires repositories and services over an initialized database.
    ///
    /// Installs the default options on first run.
    pub fn new(pool: Arc<ConnectionPool>, transport: Arc<dyn HttpTransport>) -> AppResult<Self> {
        // 1. INFRASTRUCTURE
        let event_bus = Arc::new(EventBus::new());
        let api_factory: Arc<dyn InvoicingApiFactory> =
            Arc::new(FacturaComClientFactory::new(transport));

        // 2. REPOSITORIES
        let orders: Arc<dyn OrderRepository> = Arc::new(SqliteOrderRepository::new(pool.clone()));
        let options = Arc::new(SqliteOptionRepository::new(pool.clone()));
        let outbox = Arc::new(SqliteEmailOutbox::new(pool.clone()));
        let history: Arc<dyn InvoiceEventLog> = Arc::new(SqliteInvoiceEventLog::new(pool));

        let seeded = options.seed_defaults(&DEFAULT_OPTIONS)?;
        if seeded > 0 {
            log::info!("Installed {} default invoicing options", seeded);
        }

        // 3. SERVICES
        let config: Arc<dyn ConfigProvider> = options.clone();
        let notifier: Arc<dyn Notifier> = outbox.clone();
        let invoice_service = Arc::new(InvoiceService::new(
            orders.clone(),
            config,
            api_factory.clone(),
            notifier,
            event_bus.clone(),
        ));
        let connection_service = Arc::new(ConnectionService::new(api_factory));

        // 4. EVENT HANDLERS
        register_audit_handlers(&event_bus, history.clone());

        Ok(Self {
            event_bus,
            orders,
            options,
            outbox,
            history,
            invoice_service,
            connection_service,
        })
    }
}
