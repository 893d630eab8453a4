// src/integrations/mod.rs
//
// External Integrations Module
//
// - facturacom: CFDI provider API (transport, wire types, client)
// - mail: customer notification seam and its outbox implementation

pub mod facturacom;
pub mod mail;

pub use facturacom::{
    ClientConfig, FacturaComClient, FacturaComClientFactory, HttpTransport, InvoicingApi,
    InvoicingApiFactory, ReqwestTransport,
};
pub use mail::{Notifier, SqliteEmailOutbox};
