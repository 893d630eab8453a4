use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::order::Order;

/// Order metadata keys owned by the invoicing workflow
pub mod meta {
    pub const UUID: &str = "cfdi_uuid";
    pub const PDF_URL: &str = "cfdi_pdf_url";
    pub const XML_URL: &str = "cfdi_xml_url";
    pub const SERIE: &str = "cfdi_serie";
    pub const FOLIO: &str = "cfdi_folio";
    pub const ENVIRONMENT: &str = "cfdi_environment";
    pub const GENERATED_AT: &str = "cfdi_generated_at";
    pub const CANCELLED: &str = "cfdi_cancelled";
    pub const RFC_USED: &str = "rfc_used";
    pub const API_RESPONSE: &str = "cfdi_api_response";
    pub const DEMO_PAYLOAD: &str = "cfdi_demo_payload";

    /// Every key written by a successful generation
    pub const CFDI_KEYS: [&str; 11] = [
        UUID,
        PDF_URL,
        XML_URL,
        SERIE,
        FOLIO,
        ENVIRONMENT,
        GENERATED_AT,
        CANCELLED,
        RFC_USED,
        API_RESPONSE,
        DEMO_PAYLOAD,
    ];
}

/// Where a CFDI was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CfdiEnvironment {
    Demo,
    Sandbox,
    Production,
}

impl CfdiEnvironment {
    pub fn label(&self) -> &'static str {
        match self {
            CfdiEnvironment::Demo => "Demo",
            CfdiEnvironment::Sandbox => "Sandbox",
            CfdiEnvironment::Production => "Production",
        }
    }
}

impl std::fmt::Display for CfdiEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CfdiEnvironment::Demo => write!(f, "demo"),
            CfdiEnvironment::Sandbox => write!(f, "sandbox"),
            CfdiEnvironment::Production => write!(f, "production"),
        }
    }
}

impl std::str::FromStr for CfdiEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "demo" => Ok(CfdiEnvironment::Demo),
            "sandbox" => Ok(CfdiEnvironment::Sandbox),
            "production" => Ok(CfdiEnvironment::Production),
            other => Err(format!("unknown CFDI environment '{}'", other)),
        }
    }
}

/// Invoice lifecycle state of an order, derived from its metadata.
///
/// Legal transitions: `NoInvoice -> Active`, `Active -> Cancelled`,
/// `Cancelled -> Active` (new generation) and `Active -> Active` only
/// through an explicit regenerate (cancel, then generate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceState {
    NoInvoice,
    Active,
    Cancelled,
}

impl InvoiceState {
    pub fn of(order: &Order) -> Self {
        match (order.get_meta(meta::UUID), order.get_meta(meta::CANCELLED)) {
            (None, _) => InvoiceState::NoInvoice,
            (Some(_), None) => InvoiceState::Active,
            (Some(_), Some(_)) => InvoiceState::Cancelled,
        }
    }
}

/// The identifying fields of an issued CFDI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedCfdi {
    pub uuid: String,
    pub pdf_url: Option<String>,
    pub xml_url: Option<String>,
    pub serie: String,
    pub folio: String,
}

/// Links handed to the notifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CfdiArtifacts {
    pub uuid: String,
    pub pdf_url: Option<String>,
    pub xml_url: Option<String>,
}

impl From<&IssuedCfdi> for CfdiArtifacts {
    fn from(cfdi: &IssuedCfdi) -> Self {
        Self {
            uuid: cfdi.uuid.clone(),
            pdf_url: cfdi.pdf_url.clone(),
            xml_url: cfdi.xml_url.clone(),
        }
    }
}

/// Everything the workflow stores about an order's CFDI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CfdiRecord {
    pub cfdi: IssuedCfdi,
    pub environment: CfdiEnvironment,
    pub generated_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub rfc_used: Option<String>,
}

impl CfdiRecord {
    /// Reads the record from order metadata; `None` if no CFDI was ever issued.
    ///
    /// Unparseable environment or timestamps fall back to `production` and the
    /// epoch so a hand-edited row never hides an issued invoice.
    pub fn from_order(order: &Order) -> Option<Self> {
        let uuid = order.get_meta(meta::UUID)?.to_string();

        let environment = order
            .get_meta(meta::ENVIRONMENT)
            .and_then(|s| s.parse().ok())
            .unwrap_or(CfdiEnvironment::Production);

        let generated_at = order
            .get_meta(meta::GENERATED_AT)
            .and_then(parse_timestamp)
            .unwrap_or_default();

        let cancelled_at = order.get_meta(meta::CANCELLED).map(|s| {
            parse_timestamp(s).unwrap_or_default()
        });

        Some(Self {
            cfdi: IssuedCfdi {
                uuid,
                pdf_url: order.get_meta(meta::PDF_URL).map(str::to_string),
                xml_url: order.get_meta(meta::XML_URL).map(str::to_string),
                serie: order.get_meta(meta::SERIE).unwrap_or_default().to_string(),
                folio: order.get_meta(meta::FOLIO).unwrap_or_default().to_string(),
            },
            environment,
            generated_at,
            cancelled_at,
            rfc_used: order.get_meta(meta::RFC_USED).map(str::to_string),
        })
    }

    /// Writes every field into the order's metadata map (not persisted).
    pub fn write_to(&self, order: &mut Order) {
        order.set_meta(meta::UUID, self.cfdi.uuid.clone());
        order.set_meta(meta::PDF_URL, self.cfdi.pdf_url.clone().unwrap_or_default());
        order.set_meta(meta::XML_URL, self.cfdi.xml_url.clone().unwrap_or_default());
        order.set_meta(meta::SERIE, self.cfdi.serie.clone());
        order.set_meta(meta::FOLIO, self.cfdi.folio.clone());
        order.set_meta(meta::ENVIRONMENT, self.environment.to_string());
        order.set_meta(meta::GENERATED_AT, self.generated_at.to_rfc3339());
        match self.cancelled_at {
            Some(at) => order.set_meta(meta::CANCELLED, at.to_rfc3339()),
            None => {
                order.remove_meta(meta::CANCELLED);
            }
        }
        if let Some(rfc) = &self.rfc_used {
            order.set_meta(meta::RFC_USED, rfc.clone());
        }
    }

    pub fn serie_folio(&self) -> String {
        format!("{}-{}", self.cfdi.serie, self.cfdi.folio)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Outcome of every workflow operation.
///
/// Serializes as `{"success": true, "uuid": .., "pdf_url": .., "xml_url": ..,
/// "serie": .., "folio": .., "message": ..}` or
/// `{"success": false, "error": .., "error_code": ..}`. The two shapes never mix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CfdiResult {
    success: bool,
    #[serde(flatten)]
    cfdi: Option<IssuedCfdi>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<String>,
}

impl CfdiResult {
    pub fn generated(cfdi: IssuedCfdi, message: impl Into<String>) -> Self {
        Self {
            success: true,
            cfdi: Some(cfdi),
            message: Some(message.into()),
            error: None,
            error_code: None,
        }
    }

    pub fn cancelled(cfdi: IssuedCfdi, message: impl Into<String>) -> Self {
        Self::generated(cfdi, message)
    }

    pub fn failure(code: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            cfdi: None,
            message: None,
            error: Some(error.into()),
            error_code: Some(code.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn cfdi(&self) -> Option<&IssuedCfdi> {
        self.cfdi.as_ref()
    }

    pub fn uuid(&self) -> Option<&str> {
        self.cfdi.as_ref().map(|c| c.uuid.as_str())
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }
}
