// src/integrations/facturacom/payload.rs
//
// Factura.com wire types
//
// ARCHITECTURE:
// - CfdiPayload is the CFDI 4.0 request body for `cfdi/create`
// - ProviderResponse is the typed view over a `cfdi/create` reply
//
// CRITICAL RULES:
// - Field names follow the provider's JSON exactly (serde renames)
// - No domain mutation here; the workflow decides what to persist

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::IssuedCfdi;
use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CfdiPayload {
    #[serde(rename = "Receptor")]
    pub receptor: Receptor,
    #[serde(rename = "TipoDocumento")]
    pub tipo_documento: String,
    #[serde(rename = "Conceptos")]
    pub conceptos: Vec<Concepto>,
    #[serde(rename = "UsoCFDI")]
    pub uso_cfdi: String,
    #[serde(rename = "Serie")]
    pub serie: String,
    #[serde(rename = "FormaPago")]
    pub forma_pago: String,
    #[serde(rename = "MetodoPago")]
    pub metodo_pago: String,
    #[serde(rename = "Moneda")]
    pub moneda: String,
    #[serde(rename = "LugarExpedicion")]
    pub lugar_expedicion: String,
    #[serde(rename = "EnviarCorreo")]
    pub enviar_correo: bool,
    /// Store order number, echoed back by the provider
    #[serde(rename = "NumOrder", skip_serializing_if = "Option::is_none")]
    pub num_order: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receptor {
    #[serde(rename = "Rfc")]
    pub rfc: String,
    #[serde(rename = "Nombre")]
    pub nombre: String,
    #[serde(rename = "UsoCFDI")]
    pub uso_cfdi: String,
    #[serde(rename = "RegimenFiscal", skip_serializing_if = "Option::is_none")]
    pub regimen_fiscal: Option<String>,
    #[serde(rename = "DomicilioFiscalReceptor", skip_serializing_if = "Option::is_none")]
    pub domicilio_fiscal: Option<String>,
    #[serde(rename = "Email", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concepto {
    #[serde(rename = "ClaveProdServ")]
    pub clave_prod_serv: String,
    #[serde(rename = "NoIdentificacion", skip_serializing_if = "Option::is_none")]
    pub no_identificacion: Option<String>,
    #[serde(rename = "Cantidad")]
    pub cantidad: f64,
    #[serde(rename = "ClaveUnidad")]
    pub clave_unidad: String,
    #[serde(rename = "Unidad")]
    pub unidad: String,
    #[serde(rename = "ValorUnitario")]
    pub valor_unitario: f64,
    #[serde(rename = "Descripcion")]
    pub descripcion: String,
    #[serde(rename = "Impuestos")]
    pub impuestos: Impuestos,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Impuestos {
    #[serde(rename = "Traslados")]
    pub traslados: Vec<Traslado>,
}

/// VAT transferred on one concept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Traslado {
    #[serde(rename = "Base")]
    pub base: f64,
    /// SAT tax code, "002" is IVA
    #[serde(rename = "Impuesto")]
    pub impuesto: String,
    #[serde(rename = "TipoFactor")]
    pub tipo_factor: String,
    #[serde(rename = "TasaOCuota")]
    pub tasa_o_cuota: f64,
    #[serde(rename = "Importe")]
    pub importe: f64,
}

impl Traslado {
    pub fn iva(base: f64, rate: f64) -> Self {
        Self {
            base: round_cents(base),
            impuesto: "002".to_string(),
            tipo_factor: "Tasa".to_string(),
            tasa_o_cuota: rate,
            importe: round_cents(base * rate),
        }
    }
}

pub(crate) fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Successful `cfdi/create` reply
///
/// The provider nests serie/folio under `INV` and sends the folio as either a
/// number or a string. `raw` keeps the full body for auditing.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub uuid: Option<String>,
    pub pdf_url: Option<String>,
    pub xml_url: Option<String>,
    pub serie: Option<String>,
    pub folio: Option<String>,
    pub raw: Value,
}

impl ProviderResponse {
    pub fn from_json(body: &str) -> Result<Self, ApiError> {
        let raw: Value = serde_json::from_str(body)
            .map_err(|e| ApiError::Decode(format!("invalid JSON in provider response: {}", e)))?;
        if !raw.is_object() {
            return Err(ApiError::Decode(
                "provider response is not a JSON object".to_string(),
            ));
        }
        Ok(Self::from_value(raw))
    }

    pub fn from_value(raw: Value) -> Self {
        let inv = raw.get("INV");
        Self {
            uuid: string_field(raw.get("UUID")),
            pdf_url: string_field(raw.get("pdf_url")),
            xml_url: string_field(raw.get("xml_url")),
            serie: string_field(inv.and_then(|v| v.get("Serie"))),
            folio: string_field(inv.and_then(|v| v.get("Folio"))),
            raw,
        }
    }

    /// The issued CFDI, or `None` when the provider left out the UUID
    pub fn issued(&self) -> Option<IssuedCfdi> {
        let uuid = self.uuid.clone()?;
        Some(IssuedCfdi {
            uuid,
            pdf_url: self.pdf_url.clone(),
            xml_url: self.xml_url.clone(),
            serie: self.serie.clone().unwrap_or_default(),
            folio: self.folio.clone().unwrap_or_default(),
        })
    }
}

/// Strings and numbers both read as text; empty strings read as absent
fn string_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_with_numeric_folio() {
        let body = json!({
            "response": "success",
            "UUID": "0F1E2D3C-4B5A-6978-8796-A5B4C3D2E1F0",
            "pdf_url": "https://factura.com/cfdi/a.pdf",
            "xml_url": "https://factura.com/cfdi/a.xml",
            "INV": {"Serie": "F", "Folio": 1032}
        })
        .to_string();

        let response = ProviderResponse::from_json(&body).unwrap();
        let issued = response.issued().unwrap();
        assert_eq!(issued.serie, "F");
        assert_eq!(issued.folio, "1032");
        assert_eq!(issued.pdf_url.as_deref(), Some("https://factura.com/cfdi/a.pdf"));
        assert_eq!(response.raw["response"], "success");
    }

    #[test]
    fn test_response_with_string_folio() {
        let response =
            ProviderResponse::from_value(json!({"UUID": "u", "INV": {"Serie": "A", "Folio": "77"}}));
        assert_eq!(response.folio.as_deref(), Some("77"));
        assert!(response.pdf_url.is_none());
    }

    #[test]
    fn test_missing_or_empty_uuid() {
        assert!(ProviderResponse::from_value(json!({"INV": {}})).issued().is_none());
        assert!(ProviderResponse::from_value(json!({"UUID": "  "})).issued().is_none());
    }

    #[test]
    fn test_malformed_body_is_decode_error() {
        assert!(matches!(
            ProviderResponse::from_json("<html>502</html>"),
            Err(ApiError::Decode(_))
        ));
        assert!(matches!(
            ProviderResponse::from_json("[1,2]"),
            Err(ApiError::Decode(_))
        ));
    }

    #[test]
    fn test_iva_rounding() {
        let traslado = Traslado::iva(99.999, 0.16);
        assert_eq!(traslado.base, 100.0);
        assert_eq!(traslado.importe, 16.0);
        assert_eq!(traslado.impuesto, "002");
    }

    #[test]
    fn test_payload_field_names() {
        let payload = CfdiPayload {
            receptor: Receptor {
                rfc: "XAXX010101000".to_string(),
                nombre: "Público en general".to_string(),
                uso_cfdi: "G01".to_string(),
                regimen_fiscal: None,
                domicilio_fiscal: Some("44650".to_string()),
                email: None,
            },
            tipo_documento: "factura".to_string(),
            conceptos: Vec::new(),
            uso_cfdi: "G01".to_string(),
            serie: "1247".to_string(),
            forma_pago: "01".to_string(),
            metodo_pago: "PUE".to_string(),
            moneda: "MXN".to_string(),
            lugar_expedicion: "44650".to_string(),
            enviar_correo: false,
            num_order: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["Receptor"]["Rfc"], "XAXX010101000");
        assert_eq!(json["Receptor"]["DomicilioFiscalReceptor"], "44650");
        assert!(json["Receptor"].get("RegimenFiscal").is_none());
        assert_eq!(json["TipoDocumento"], "factura");
        assert_eq!(json["EnviarCorreo"], false);
        assert!(json.get("NumOrder").is_none());
    }
}
