// src/application/error_handling.rs
//
// Error Handling for Commands
//
// ARCHITECTURE:
// - Maps internal errors → admin-friendly responses
// - Provides a consistent error format for any host surface
// - Never exposes SQL errors or raw provider bodies
// - Logs the full error for debugging

use serde::{Deserialize, Serialize};

use crate::error::{AppError, InvoiceError};

/// Standard error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error_type: ErrorType,
    pub message: String,
    pub details: Option<String>,
}

/// Error categories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Order or row missing (404)
    NotFound,

    /// Invalid input (400)
    Validation,

    /// Operation not allowed in the invoice's current state (409)
    Conflict,

    /// Settings incomplete for the requested mode (412)
    Configuration,

    /// Database/persistence error (500)
    Database,

    /// Factura.com error (502)
    ExternalService,

    /// Other/unknown error (500)
    Internal,
}

impl ErrorResponse {
    pub fn from_app_error(error: AppError) -> Self {
        match error {
            AppError::NotFound => Self::not_found("Resource"),

            AppError::Domain(domain_error) => Self {
                success: false,
                error_type: ErrorType::Validation,
                message: "Validation failed".to_string(),
                details: Some(domain_error.to_string()),
            },

            AppError::Database(_) | AppError::Pool(_) => {
                log::error!("Storage error: {}", error);
                Self {
                    success: false,
                    error_type: ErrorType::Database,
                    message: "Database operation failed".to_string(),
                    details: Some("Check logs for details".to_string()),
                }
            }

            AppError::Serialization(_) | AppError::Io(_) => {
                log::error!("Internal error: {}", error);
                Self {
                    success: false,
                    error_type: ErrorType::Internal,
                    message: "Internal error".to_string(),
                    details: None,
                }
            }

            AppError::Other(message) => {
                log::error!("Other error: {}", message);
                Self {
                    success: false,
                    error_type: ErrorType::Internal,
                    message,
                    details: None,
                }
            }
        }
    }

    pub fn from_invoice_error(error: InvoiceError) -> Self {
        let error_type = match &error {
            InvoiceError::OrderNotFound => ErrorType::NotFound,
            InvoiceError::AlreadyInvoiced | InvoiceError::NoActiveInvoice => ErrorType::Conflict,
            InvoiceError::ConfigurationInvalid(_) => ErrorType::Configuration,
            InvoiceError::PayloadError(_) => ErrorType::Validation,
            InvoiceError::Api(_) | InvoiceError::MissingUuid => ErrorType::ExternalService,
            InvoiceError::Storage(_) => ErrorType::Database,
        };
        if matches!(error_type, ErrorType::ExternalService | ErrorType::Database) {
            log::error!("Invoice error: {}", error);
        }

        Self {
            success: false,
            error_type,
            message: error.user_message(),
            details: Some(error.code().to_string()),
        }
    }

    pub fn validation(message: String) -> Self {
        Self {
            success: false,
            error_type: ErrorType::Validation,
            message,
            details: None,
        }
    }

    pub fn not_found(resource: &str) -> Self {
        Self {
            success: false,
            error_type: ErrorType::NotFound,
            message: format!("{} not found", resource),
            details: None,
        }
    }

    /// JSON string form used as the command error value
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "Internal error".to_string())
    }
}

/// Helper trait to convert Results into command results
pub trait ToErrorResponse<T> {
    fn to_error_response(self) -> Result<T, String>;
}

impl<T> ToErrorResponse<T> for Result<T, AppError> {
    fn to_error_response(self) -> Result<T, String> {
        self.map_err(|e| ErrorResponse::from_app_error(e).to_json())
    }
}

impl<T> ToErrorResponse<T> for Result<T, InvoiceError> {
    fn to_error_response(self) -> Result<T, String> {
        self.map_err(|e| ErrorResponse::from_invoice_error(e).to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    #[test]
    fn test_not_found_error() {
        let error = ErrorResponse::from_app_error(AppError::NotFound);
        assert_eq!(error.error_type, ErrorType::NotFound);
        assert_eq!(error.message, "Resource not found");
    }

    #[test]
    fn test_validation_error() {
        let error = ErrorResponse::validation("Invalid input".to_string());
        assert_eq!(error.error_type, ErrorType::Validation);
        assert_eq!(error.message, "Invalid input");
    }

    #[test]
    fn test_invoice_errors_are_categorized() {
        let conflict = ErrorResponse::from_invoice_error(InvoiceError::AlreadyInvoiced);
        assert_eq!(conflict.error_type, ErrorType::Conflict);
        assert_eq!(conflict.details.as_deref(), Some("already_invoiced"));

        let provider = ErrorResponse::from_invoice_error(InvoiceError::Api(ApiError::HttpStatus {
            status: 500,
            body: "secret body".to_string(),
        }));
        assert_eq!(provider.error_type, ErrorType::ExternalService);
        assert!(!provider.to_json().contains("secret body"));
    }

    #[test]
    fn test_serialization() {
        let json = ErrorResponse::not_found("Order").to_json();
        assert!(json.contains("not_found"));
        assert!(json.contains("Order not found"));
    }
}
