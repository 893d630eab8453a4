// src/application/dto/mod.rs
//
// Data Transfer Objects
//
// CRITICAL PRINCIPLES:
// - DTOs are admin-surface representations
// - DTOs are simple, serializable structs
// - Conversion FROM domain/service types only (never TO)

use serde::{Deserialize, Serialize};

use crate::domain::{CfdiRecord, CfdiResult, InvoiceState};
use crate::services::InvoiceStatus;

// ============================================================================
// INVOICE DTOs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateCfdiDto {
    pub order_id: i64,
    /// Cancel the active CFDI first and issue a new one
    #[serde(default)]
    pub regenerate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceStatusDto {
    pub order_id: i64,
    /// "no_invoice", "active" or "cancelled"
    pub state: String,
    pub uuid: Option<String>,
    pub serie_folio: Option<String>,
    pub environment: Option<String>,
    pub pdf_url: Option<String>,
    pub xml_url: Option<String>,
    pub rfc_used: Option<String>,
    pub generated_at: Option<String>,
    pub cancelled_at: Option<String>,
}

impl From<InvoiceStatus> for InvoiceStatusDto {
    fn from(status: InvoiceStatus) -> Self {
        let state = match status.state {
            InvoiceState::NoInvoice => "no_invoice",
            InvoiceState::Active => "active",
            InvoiceState::Cancelled => "cancelled",
        };

        let record = status.record;
        Self {
            order_id: status.order_id.0,
            state: state.to_string(),
            serie_folio: record.as_ref().map(CfdiRecord::serie_folio),
            environment: record.as_ref().map(|r| r.environment.to_string()),
            generated_at: record.as_ref().map(|r| r.generated_at.to_rfc3339()),
            cancelled_at: record
                .as_ref()
                .and_then(|r| r.cancelled_at)
                .map(|at| at.to_rfc3339()),
            rfc_used: record.as_ref().and_then(|r| r.rfc_used.clone()),
            uuid: record.as_ref().map(|r| r.cfdi.uuid.clone()),
            pdf_url: record.as_ref().and_then(|r| r.cfdi.pdf_url.clone()),
            xml_url: record.and_then(|r| r.cfdi.xml_url),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderCompletedDto {
    pub order_id: i64,
    pub scheduled: bool,
    /// Present when the caller waited for the automatic generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CfdiResult>,
}

// ============================================================================
// SETTINGS DTOs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConnectionDto {
    pub api_key: String,
    pub api_secret: String,
    #[serde(default)]
    pub sandbox: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingDto {
    pub name: String,
    /// Credentials are masked
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CfdiEnvironment, IssuedCfdi, OrderId};
    use chrono::Utc;

    #[test]
    fn test_status_dto_without_invoice() {
        let dto = InvoiceStatusDto::from(InvoiceStatus {
            order_id: OrderId(3),
            state: InvoiceState::NoInvoice,
            record: None,
        });
        assert_eq!(dto.state, "no_invoice");
        assert!(dto.uuid.is_none());
        assert!(dto.serie_folio.is_none());
    }

    #[test]
    fn test_status_dto_with_cancelled_invoice() {
        let dto = InvoiceStatusDto::from(InvoiceStatus {
            order_id: OrderId(4),
            state: InvoiceState::Cancelled,
            record: Some(CfdiRecord {
                cfdi: IssuedCfdi {
                    uuid: "u-4".to_string(),
                    pdf_url: None,
                    xml_url: Some("https://factura.com/demo/cfdi/u-4.xml".to_string()),
                    serie: "DEMO".to_string(),
                    folio: "4321".to_string(),
                },
                environment: CfdiEnvironment::Demo,
                generated_at: Utc::now(),
                cancelled_at: Some(Utc::now()),
                rfc_used: None,
            }),
        });
        assert_eq!(dto.state, "cancelled");
        assert_eq!(dto.serie_folio.as_deref(), Some("DEMO-4321"));
        assert_eq!(dto.environment.as_deref(), Some("demo"));
        assert!(dto.cancelled_at.is_some());
        assert!(dto.xml_url.is_some());
    }

    #[test]
    fn test_generate_dto_defaults_regenerate() {
        let dto: GenerateCfdiDto = serde_json::from_str(r#"{"order_id": 42}"#).unwrap();
        assert_eq!(dto.order_id, 42);
        assert!(!dto.regenerate);
    }
}
