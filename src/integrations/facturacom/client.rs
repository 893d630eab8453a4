// src/integrations/facturacom/client.rs
//
// Factura.com API client
//
// ARCHITECTURE:
// - Built from one settings snapshot; base URL follows the snapshot's
//   sandbox flag, so there is no mode cached between operations
// - All I/O goes through an HttpTransport
// - Maps orders → CfdiPayload and replies → ProviderResponse
//
// CRITICAL RULES:
// - This is INFRASTRUCTURE, not DOMAIN
// - Never persists anything; the workflow owns order metadata
// - Every transport, status and decode failure surfaces as ApiError

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::payload::{CfdiPayload, Concepto, Impuestos, ProviderResponse, Receptor, Traslado};
use super::transport::{HttpMethod, HttpRequest, HttpTransport};
use crate::config::{ApiCredentials, InvoicingSettings, TaxDefaults};
use crate::domain::{normalize_rfc, validate_order_for_invoicing, DomainResult, LineItem, Order};
use crate::error::ApiError;

pub const PRODUCTION_BASE_URL: &str = "https://factura.com/api/v1/";
pub const SANDBOX_BASE_URL: &str = "https://sandbox.factura.com/api/v1/";

const DEFAULT_RECEIVER_NAME: &str = "Público en general";

/// What a client instance needs from the settings snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub credentials: ApiCredentials,
    pub serie_id: String,
    pub tax: TaxDefaults,
}

impl From<&InvoicingSettings> for ClientConfig {
    fn from(settings: &InvoicingSettings) -> Self {
        Self {
            credentials: settings.credentials(),
            serie_id: settings.serie_id.clone(),
            tax: settings.tax.clone(),
        }
    }
}

impl ClientConfig {
    /// Credentials only, with catalog defaults (connection checks)
    pub fn for_credentials(credentials: ApiCredentials) -> Self {
        Self {
            credentials,
            serie_id: String::new(),
            tax: TaxDefaults::default(),
        }
    }
}

/// Operations the invoicing workflow needs from the provider
#[async_trait]
pub trait InvoicingApi: Send + Sync {
    fn prepare_cfdi_data(&self, order: &Order) -> DomainResult<CfdiPayload>;

    async fn create_cfdi(&self, payload: &CfdiPayload) -> Result<ProviderResponse, ApiError>;

    async fn get_cfdi(&self, uuid: &str) -> Result<Value, ApiError>;

    async fn cancel_cfdi(&self, uuid: &str) -> Result<(), ApiError>;

    /// `true` only when the provider answers `{"valid": true}`
    async fn validate_credentials(&self) -> bool;
}

/// Builds a client per settings snapshot
pub trait InvoicingApiFactory: Send + Sync {
    fn build(&self, config: ClientConfig) -> Arc<dyn InvoicingApi>;
}

pub struct FacturaComClient {
    transport: Arc<dyn HttpTransport>,
    config: ClientConfig,
}

impl FacturaComClient {
    pub fn new(transport: Arc<dyn HttpTransport>, config: ClientConfig) -> Self {
        Self { transport, config }
    }

    pub fn base_url(&self) -> &'static str {
        if self.config.credentials.sandbox {
            SANDBOX_BASE_URL
        } else {
            PRODUCTION_BASE_URL
        }
    }

    fn request(&self, method: HttpMethod, path: &str, body: Option<Value>) -> HttpRequest {
        HttpRequest {
            method,
            url: format!("{}{}", self.base_url(), path),
            bearer_token: self.config.credentials.api_key.clone(),
            body,
            verify_tls: !self.config.credentials.sandbox,
        }
    }

    /// Sends and rejects non-2xx replies; returns the raw body
    async fn send(&self, request: HttpRequest) -> Result<String, ApiError> {
        let url = request.url.clone();
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            log::error!(
                "Factura.com returned HTTP {} for {}: {}",
                response.status,
                url,
                response.body
            );
            return Err(ApiError::HttpStatus {
                status: response.status,
                body: response.body,
            });
        }

        Ok(response.body)
    }

    fn decode(body: &str) -> Result<Value, ApiError> {
        serde_json::from_str(body)
            .map_err(|e| ApiError::Decode(format!("invalid JSON in provider response: {}", e)))
    }

    fn concepto(&self, item: &LineItem) -> Concepto {
        let tax = &self.config.tax;
        Concepto {
            clave_prod_serv: tax.clave_prod_serv.clone(),
            no_identificacion: item.sku.clone().filter(|s| !s.is_empty()),
            cantidad: item.quantity,
            clave_unidad: tax.clave_unidad.clone(),
            unidad: tax.unidad.clone(),
            valor_unitario: item.unit_price,
            descripcion: item.description.clone(),
            impuestos: Impuestos {
                traslados: vec![Traslado::iva(item.subtotal(), tax.tasa_iva)],
            },
        }
    }
}

#[async_trait]
impl InvoicingApi for FacturaComClient {
    fn prepare_cfdi_data(&self, order: &Order) -> DomainResult<CfdiPayload> {
        validate_order_for_invoicing(order)?;

        let tax = &self.config.tax;
        let billing = &order.billing;
        let nombre = match billing.name.trim() {
            "" => DEFAULT_RECEIVER_NAME.to_string(),
            name => name.to_string(),
        };

        Ok(CfdiPayload {
            receptor: Receptor {
                rfc: normalize_rfc(billing.rfc.as_deref().unwrap_or_default()),
                nombre,
                uso_cfdi: tax.uso_cfdi.clone(),
                regimen_fiscal: billing.tax_regime.clone().filter(|s| !s.is_empty()),
                domicilio_fiscal: billing.postal_code.clone().filter(|s| !s.is_empty()),
                email: billing.email.clone().filter(|s| !s.is_empty()),
            },
            tipo_documento: "factura".to_string(),
            conceptos: order.items.iter().map(|item| self.concepto(item)).collect(),
            uso_cfdi: tax.uso_cfdi.clone(),
            serie: self.config.serie_id.clone(),
            forma_pago: tax.forma_pago.clone(),
            metodo_pago: tax.metodo_pago.clone(),
            moneda: "MXN".to_string(),
            lugar_expedicion: tax.lugar_expedicion.clone(),
            enviar_correo: false,
            num_order: Some(order.id.to_string()),
        })
    }

    async fn create_cfdi(&self, payload: &CfdiPayload) -> Result<ProviderResponse, ApiError> {
        let body = serde_json::to_value(payload)
            .map_err(|e| ApiError::Decode(format!("failed to encode payload: {}", e)))?;
        log::debug!("cfdi/create payload: {}", body);

        let request = self.request(HttpMethod::Post, "cfdi/create", Some(body));
        let response = self.send(request).await?;
        ProviderResponse::from_json(&response)
    }

    async fn get_cfdi(&self, uuid: &str) -> Result<Value, ApiError> {
        let request = self.request(HttpMethod::Get, &format!("cfdi/{}", uuid), None);
        let response = self.send(request).await?;
        Self::decode(&response)
    }

    async fn cancel_cfdi(&self, uuid: &str) -> Result<(), ApiError> {
        let request = self.request(HttpMethod::Post, &format!("cfdi/{}/cancel", uuid), None);
        self.send(request).await?;
        Ok(())
    }

    async fn validate_credentials(&self) -> bool {
        let request = self.request(HttpMethod::Get, "auth/validate", None);

        let body = match self.send(request).await {
            Ok(body) => body,
            Err(e) => {
                log::error!("Credential validation failed ({}): {}", e.kind(), e);
                return false;
            }
        };

        match Self::decode(&body) {
            Ok(value) => value.get("valid").and_then(Value::as_bool) == Some(true),
            Err(e) => {
                log::error!("Credential validation failed: {}", e);
                false
            }
        }
    }
}

/// Production factory sharing one transport across clients
pub struct FacturaComClientFactory {
    transport: Arc<dyn HttpTransport>,
}

impl FacturaComClientFactory {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

impl InvoicingApiFactory for FacturaComClientFactory {
    fn build(&self, config: ClientConfig) -> Arc<dyn InvoicingApi> {
        Arc::new(FacturaComClient::new(Arc::clone(&self.transport), config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BillingDetails, LineItem, OrderId};
    use crate::integrations::facturacom::transport::{HttpResponse, MockHttpTransport};
    use mockall::predicate::function;

    fn config(sandbox: bool) -> ClientConfig {
        ClientConfig {
            credentials: ApiCredentials {
                api_key: "key-123".to_string(),
                api_secret: "secret".to_string(),
                sandbox,
            },
            serie_id: "1247".to_string(),
            tax: TaxDefaults::default(),
        }
    }

    fn client(transport: MockHttpTransport, sandbox: bool) -> FacturaComClient {
        FacturaComClient::new(Arc::new(transport), config(sandbox))
    }

    fn order() -> Order {
        let billing = BillingDetails {
            name: "Ana López".to_string(),
            email: Some("ana@example.test".to_string()),
            rfc: Some(" loaa800101ab1 ".to_string()),
            postal_code: Some("06600".to_string()),
            tax_regime: Some("605".to_string()),
        };
        let mut mug = LineItem::new("Mug", 2.0, 150.0);
        mug.sku = Some("MUG-01".to_string());
        Order::new(OrderId(42), billing, vec![mug])
    }

    fn ok(body: &str) -> Result<HttpResponse, ApiError> {
        Ok(HttpResponse {
            status: 200,
            body: body.to_string(),
        })
    }

    #[test]
    fn test_base_url_follows_sandbox_flag() {
        assert_eq!(client(MockHttpTransport::new(), true).base_url(), SANDBOX_BASE_URL);
        assert_eq!(client(MockHttpTransport::new(), false).base_url(), PRODUCTION_BASE_URL);
    }

    #[test]
    fn test_prepare_cfdi_data_maps_order() {
        let payload = client(MockHttpTransport::new(), true)
            .prepare_cfdi_data(&order())
            .unwrap();

        assert_eq!(payload.receptor.rfc, "LOAA800101AB1");
        assert_eq!(payload.receptor.regimen_fiscal.as_deref(), Some("605"));
        assert_eq!(payload.serie, "1247");
        assert_eq!(payload.moneda, "MXN");
        assert_eq!(payload.tipo_documento, "factura");
        assert!(!payload.enviar_correo);
        assert_eq!(payload.num_order.as_deref(), Some("42"));

        let concepto = &payload.conceptos[0];
        assert_eq!(concepto.clave_prod_serv, "81112101");
        assert_eq!(concepto.clave_unidad, "E48");
        assert_eq!(concepto.no_identificacion.as_deref(), Some("MUG-01"));
        assert_eq!(concepto.impuestos.traslados[0].base, 300.0);
        assert_eq!(concepto.impuestos.traslados[0].importe, 48.0);
    }

    #[test]
    fn test_prepare_cfdi_data_rejects_missing_rfc() {
        let mut order = order();
        order.billing.rfc = None;
        assert!(client(MockHttpTransport::new(), true)
            .prepare_cfdi_data(&order)
            .is_err());
    }

    #[test]
    fn test_prepare_cfdi_data_defaults_receiver_name() {
        let mut order = order();
        order.billing.name = "  ".to_string();
        let payload = client(MockHttpTransport::new(), true)
            .prepare_cfdi_data(&order)
            .unwrap();
        assert_eq!(payload.receptor.nombre, DEFAULT_RECEIVER_NAME);
    }

    #[tokio::test]
    async fn test_create_cfdi_posts_to_sandbox() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .with(function(|req: &HttpRequest| {
                req.method == HttpMethod::Post
                    && req.url == "https://sandbox.factura.com/api/v1/cfdi/create"
                    && req.bearer_token == "key-123"
                    && !req.verify_tls
                    && req.body.as_ref().map(|b| b["Serie"] == "1247").unwrap_or(false)
            }))
            .times(1)
            .returning(|_| ok(r#"{"UUID":"abc","INV":{"Serie":"F","Folio":9}}"#));

        let client = client(transport, true);
        let payload = client.prepare_cfdi_data(&order()).unwrap();
        let response = client.create_cfdi(&payload).await.unwrap();

        assert_eq!(response.uuid.as_deref(), Some("abc"));
        assert_eq!(response.folio.as_deref(), Some("9"));
    }

    #[tokio::test]
    async fn test_http_error_status_is_reported() {
        let mut transport = MockHttpTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Ok(HttpResponse {
                status: 422,
                body: r#"{"message":"RFC invalido"}"#.to_string(),
            })
        });

        let client = client(transport, false);
        let payload = client.prepare_cfdi_data(&order()).unwrap();
        let err = client.create_cfdi(&payload).await.unwrap_err();

        assert!(matches!(err, ApiError::HttpStatus { status: 422, .. }));
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| ok("<html>gateway</html>"));

        let err = client(transport, false).get_cfdi("abc").await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn test_cancel_uses_production_url_with_tls() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .with(function(|req: &HttpRequest| {
                req.url == "https://factura.com/api/v1/cfdi/abc/cancel" && req.verify_tls
            }))
            .times(1)
            .returning(|_| ok(r#"{"response":"success"}"#));

        assert!(client(transport, false).cancel_cfdi("abc").await.is_ok());
    }

    #[tokio::test]
    async fn test_validate_credentials() {
        let mut valid = MockHttpTransport::new();
        valid
            .expect_send()
            .returning(|_| ok(r#"{"valid":true}"#));
        assert!(client(valid, true).validate_credentials().await);

        let mut invalid = MockHttpTransport::new();
        invalid
            .expect_send()
            .returning(|_| ok(r#"{"valid":false}"#));
        assert!(!client(invalid, true).validate_credentials().await);

        let mut unreachable = MockHttpTransport::new();
        unreachable
            .expect_send()
            .returning(|_| Err(ApiError::Network("connection refused".to_string())));
        assert!(!client(unreachable, true).validate_credentials().await);
    }
}
