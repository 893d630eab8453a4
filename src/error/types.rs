// src/error/types.rs
use crate::domain::DomainError;
use serde::Serialize;
use thiserror::Error;

/// Infrastructure errors (storage, serialization, IO).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(String),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Resource not found")]
    NotFound,

    #[error("Other error: {0}")]
    Other(String),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<chrono::ParseError> for AppError {
    fn from(err: chrono::ParseError) -> Self {
        AppError::Other(format!("Date parse error: {}", err))
    }
}

impl From<r2d2::Error> for AppError {
    fn from(err: r2d2::Error) -> Self {
        AppError::Pool(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Failures talking to the invoicing provider.
///
/// Transport and decoding failures are translated into this type at the
/// client boundary; nothing above the client sees a `reqwest` error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Provider unreachable, connection reset or timeout.
    #[error("network error: {0}")]
    Network(String),

    /// Provider answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Response body was not the JSON we expected.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Network(_) => "network",
            ApiError::HttpStatus { .. } => "http_status",
            ApiError::Decode(_) => "decode",
        }
    }
}

/// Workflow-level failures of the invoice state machine.
#[derive(Debug, Error)]
pub enum InvoiceError {
    #[error("order not found")]
    OrderNotFound,

    #[error("order already has an active CFDI")]
    AlreadyInvoiced,

    #[error("order has no active CFDI")]
    NoActiveInvoice,

    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    #[error("invalid invoice data: {0}")]
    PayloadError(String),

    #[error("provider error: {0}")]
    Api(#[from] ApiError),

    #[error("provider response did not include a UUID")]
    MissingUuid,

    #[error("storage error: {0}")]
    Storage(#[from] AppError),
}

impl InvoiceError {
    /// Stable machine-readable code, used by the command surface.
    pub fn code(&self) -> &'static str {
        match self {
            InvoiceError::OrderNotFound => "order_not_found",
            InvoiceError::AlreadyInvoiced => "already_invoiced",
            InvoiceError::NoActiveInvoice => "no_active_invoice",
            InvoiceError::ConfigurationInvalid(_) => "configuration_invalid",
            InvoiceError::PayloadError(_) => "payload_error",
            InvoiceError::Api(_) => "api_error",
            InvoiceError::MissingUuid => "missing_uuid",
            InvoiceError::Storage(_) => "storage_error",
        }
    }

    /// Short message safe to show an administrator.
    ///
    /// Provider bodies and SQL errors are never included; they go to the log.
    pub fn user_message(&self) -> String {
        match self {
            InvoiceError::OrderNotFound => "Order not found".to_string(),
            InvoiceError::AlreadyInvoiced => {
                "This order already has a CFDI. Use regenerate to replace it.".to_string()
            }
            InvoiceError::NoActiveInvoice => "This order has no active CFDI".to_string(),
            InvoiceError::ConfigurationInvalid(reason) => reason.clone(),
            InvoiceError::PayloadError(reason) => format!("Invalid invoice data: {}", reason),
            InvoiceError::Api(ApiError::Network(_)) => {
                "Could not reach Factura.com. Try again later.".to_string()
            }
            InvoiceError::Api(ApiError::HttpStatus { status, .. }) => {
                format!("Factura.com rejected the request (HTTP {})", status)
            }
            InvoiceError::Api(ApiError::Decode(_)) => {
                "Factura.com returned an unexpected response".to_string()
            }
            InvoiceError::MissingUuid => "UUID not received from the API".to_string(),
            InvoiceError::Storage(_) => "Could not save invoice data".to_string(),
        }
    }
}

pub type InvoiceResult<T> = Result<T, InvoiceError>;
