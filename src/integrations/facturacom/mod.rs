// src/integrations/facturacom/mod.rs
//
// Factura.com CFDI provider

pub mod client;
pub mod payload;
pub mod transport;

pub use client::{
    ClientConfig, FacturaComClient, FacturaComClientFactory, InvoicingApi, InvoicingApiFactory,
    PRODUCTION_BASE_URL, SANDBOX_BASE_URL,
};
pub use payload::{CfdiPayload, Concepto, Impuestos, ProviderResponse, Receptor, Traslado};
pub use transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
