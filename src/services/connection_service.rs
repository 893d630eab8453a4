// src/services/connection_service.rs
//
// Connection Service - credential check for the settings screen
//
// CRITICAL RULES:
// - Uses exactly the credentials it is given, never the stored options
// - Never mutates configuration
// - Best-effort: every failure is a result, not an error

use std::sync::Arc;

use serde::Serialize;

use crate::config::ApiCredentials;
use crate::domain::CfdiEnvironment;
use crate::integrations::facturacom::{ClientConfig, InvoicingApiFactory};

/// Keys shorter than this are typos, not credentials
const MIN_CREDENTIAL_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionTestResult {
    pub success: bool,
    pub message: String,
    pub environment: String,
}

pub struct ConnectionService {
    api_factory: Arc<dyn InvoicingApiFactory>,
}

impl ConnectionService {
    pub fn new(api_factory: Arc<dyn InvoicingApiFactory>) -> Self {
        Self { api_factory }
    }

    pub async fn test_connection(
        &self,
        api_key: &str,
        api_secret: &str,
        sandbox: bool,
    ) -> ConnectionTestResult {
        let environment = if sandbox {
            CfdiEnvironment::Sandbox
        } else {
            CfdiEnvironment::Production
        };
        let result = |success: bool, message: &str| ConnectionTestResult {
            success,
            message: message.to_string(),
            environment: environment.label().to_string(),
        };

        let api_key = api_key.trim();
        let api_secret = api_secret.trim();

        if api_key.is_empty() || api_secret.is_empty() {
            return result(false, "API key and secret are required");
        }
        if api_key.len() < MIN_CREDENTIAL_LEN {
            return result(false, "API key looks invalid (too short)");
        }
        if api_secret.len() < MIN_CREDENTIAL_LEN {
            return result(false, "API secret looks invalid (too short)");
        }

        let api = self
            .api_factory
            .build(ClientConfig::for_credentials(ApiCredentials {
                api_key: api_key.to_string(),
                api_secret: api_secret.to_string(),
                sandbox,
            }));

        if api.validate_credentials().await {
            log::info!("Factura.com credentials validated ({})", environment.label());
            result(true, "Credentials are valid")
        } else {
            log::info!("Factura.com rejected credentials ({})", environment.label());
            result(false, "Factura.com did not accept these credentials")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::facturacom::transport::{HttpResponse, MockHttpTransport};
    use crate::integrations::facturacom::{FacturaComClientFactory, HttpRequest};
    use mockall::predicate::function;

    fn service(transport: MockHttpTransport) -> ConnectionService {
        ConnectionService::new(Arc::new(FacturaComClientFactory::new(Arc::new(transport))))
    }

    #[tokio::test]
    async fn test_empty_credentials_fail_without_network() {
        let mut transport = MockHttpTransport::new();
        transport.expect_send().never();

        let result = service(transport).test_connection("", "secret", true).await;
        assert!(!result.success);
        assert_eq!(result.environment, "Sandbox");
    }

    #[tokio::test]
    async fn test_short_key_fails_without_network() {
        let mut transport = MockHttpTransport::new();
        transport.expect_send().never();

        let result = service(transport)
            .test_connection("abc", "secret-0123456789", false)
            .await;
        assert!(!result.success);
        assert!(result.message.contains("too short"));
    }

    #[tokio::test]
    async fn test_uses_given_credentials_and_environment() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .with(function(|req: &HttpRequest| {
                req.url == "https://factura.com/api/v1/auth/validate"
                    && req.bearer_token == "live-key-0123456789"
            }))
            .times(1)
            .returning(|_| {
                Ok(HttpResponse {
                    status: 200,
                    body: r#"{"valid":true}"#.to_string(),
                })
            });

        let result = service(transport)
            .test_connection(" live-key-0123456789 ", "live-secret-0123456789", false)
            .await;
        assert!(result.success);
        assert_eq!(result.environment, "Production");
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let mut transport = MockHttpTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Ok(HttpResponse {
                status: 401,
                body: r#"{"message":"unauthorized"}"#.to_string(),
            })
        });

        let result = service(transport)
            .test_connection("key-0123456789", "secret-0123456789", true)
            .await;
        assert!(!result.success);
    }
}
