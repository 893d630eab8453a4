// src/integrations/facturacom/transport.rs
//
// HTTP transport for the Factura.com API
//
// The transport only moves bytes: it never interprets status codes or
// bodies. Connection failures and timeouts come back as `ApiError::Network`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};

use crate::error::{ApiError, AppError, AppResult};

pub const USER_AGENT: &str = "WooCommerce-FacturaCom/1.0.0";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub bearer_token: String,
    pub body: Option<serde_json::Value>,
    /// `false` only for the sandbox endpoint
    pub verify_tls: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// reqwest-backed transport
///
/// Holds one verifying client and one that accepts self-signed certificates
/// (sandbox). The request decides which one is used.
pub struct ReqwestTransport {
    verified: Client,
    insecure: Client,
}

impl ReqwestTransport {
    pub fn new() -> AppResult<Self> {
        Ok(Self {
            verified: Self::build_client(false)?,
            insecure: Self::build_client(true)?,
        })
    }

    fn build_client(accept_invalid_certs: bool) -> AppResult<Client> {
        Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| AppError::Other(format!("Failed to create HTTP client: {}", e)))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let client = if request.verify_tls {
            &self.verified
        } else {
            log::warn!(
                "TLS certificate verification disabled for sandbox request to {}",
                request.url
            );
            &self.insecure
        };

        let mut builder = match request.method {
            HttpMethod::Get => client.get(&request.url),
            HttpMethod::Post => client.post(&request.url),
        }
        .header(header::AUTHORIZATION, format!("Bearer {}", request.bearer_token))
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "application/json");

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Network(format!("request to {} timed out", request.url))
            } else {
                ApiError::Network(format!("request to {} failed: {}", request.url, e))
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(format!("failed to read response body: {}", e)))?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_creation() {
        assert!(ReqwestTransport::new().is_ok());
    }

    #[test]
    fn test_success_range() {
        assert!(HttpResponse { status: 200, body: String::new() }.is_success());
        assert!(HttpResponse { status: 201, body: String::new() }.is_success());
        assert!(!HttpResponse { status: 302, body: String::new() }.is_success());
        assert!(!HttpResponse { status: 404, body: String::new() }.is_success());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let transport = ReqwestTransport::new().unwrap();
        // Nothing listens on the discard port locally
        let result = transport
            .send(HttpRequest {
                method: HttpMethod::Get,
                url: "http://127.0.0.1:9/auth/validate".to_string(),
                bearer_token: "k".to_string(),
                body: None,
                verify_tls: true,
            })
            .await;
        assert!(matches!(result, Err(ApiError::Network(_))));
    }
}
