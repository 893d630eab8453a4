// src/config/settings.rs
//
// Invoicing settings snapshot
//
// Options are read once per workflow invocation, so a single
// generate/cancel call never observes a half-updated configuration.

use std::time::Duration;

use crate::domain::CfdiEnvironment;
use crate::error::{AppError, AppResult};
use crate::repositories::ConfigProvider;

/// Option names as stored in the options table
pub mod keys {
    pub const DEMO_MODE: &str = "demo_mode";
    pub const SANDBOX_MODE: &str = "sandbox_mode";
    pub const API_KEY: &str = "api_key";
    pub const API_SECRET: &str = "api_secret";
    pub const SERIE_ID: &str = "serie_id";
    pub const AUTO_GENERATE: &str = "auto_generate";
    pub const AUTO_GENERATE_DELAY_SECS: &str = "auto_generate_delay_secs";
    pub const SEND_EMAIL: &str = "send_email";
    pub const USO_CFDI: &str = "uso_cfdi";
    pub const FORMA_PAGO: &str = "forma_pago";
    pub const METODO_PAGO: &str = "metodo_pago";
    pub const CLAVE_PROD_SERV: &str = "clave_prod_serv";
    pub const CLAVE_UNIDAD: &str = "clave_unidad";
    pub const UNIDAD: &str = "unidad";
    pub const TASA_IVA: &str = "tasa_iva";
    pub const LUGAR_EXPEDICION: &str = "lugar_expedicion";
}

/// Values installed on first run; existing values are never overwritten.
pub const DEFAULT_OPTIONS: [(&str, &str); 14] = [
    (keys::DEMO_MODE, "yes"),
    (keys::SANDBOX_MODE, "yes"),
    (keys::AUTO_GENERATE, "no"),
    (keys::AUTO_GENERATE_DELAY_SECS, "5"),
    (keys::SEND_EMAIL, "yes"),
    (keys::USO_CFDI, "G01"),
    (keys::FORMA_PAGO, "01"),
    (keys::METODO_PAGO, "PUE"),
    (keys::CLAVE_PROD_SERV, "81112101"),
    (keys::CLAVE_UNIDAD, "E48"),
    (keys::UNIDAD, "Unidad de servicio"),
    (keys::TASA_IVA, "0.16"),
    (keys::LUGAR_EXPEDICION, "44650"),
    (keys::SERIE_ID, ""),
];

fn default_for(name: &str) -> &'static str {
    DEFAULT_OPTIONS
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, value)| *value)
        .unwrap_or("")
}

/// Credentials and endpoint selection for one client instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub sandbox: bool,
}

/// SAT catalog defaults applied to every invoice
#[derive(Debug, Clone, PartialEq)]
pub struct TaxDefaults {
    pub uso_cfdi: String,
    pub forma_pago: String,
    pub metodo_pago: String,
    pub clave_prod_serv: String,
    pub clave_unidad: String,
    pub unidad: String,
    pub tasa_iva: f64,
    pub lugar_expedicion: String,
}

impl Default for TaxDefaults {
    fn default() -> Self {
        Self {
            uso_cfdi: default_for(keys::USO_CFDI).to_string(),
            forma_pago: default_for(keys::FORMA_PAGO).to_string(),
            metodo_pago: default_for(keys::METODO_PAGO).to_string(),
            clave_prod_serv: default_for(keys::CLAVE_PROD_SERV).to_string(),
            clave_unidad: default_for(keys::CLAVE_UNIDAD).to_string(),
            unidad: default_for(keys::UNIDAD).to_string(),
            tasa_iva: 0.16,
            lugar_expedicion: default_for(keys::LUGAR_EXPEDICION).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvoicingSettings {
    pub demo_mode: bool,
    pub sandbox_mode: bool,
    pub api_key: String,
    pub api_secret: String,
    pub serie_id: String,
    pub auto_generate: bool,
    pub auto_generate_delay: Duration,
    pub send_email: bool,
    pub tax: TaxDefaults,
}

impl Default for InvoicingSettings {
    fn default() -> Self {
        Self {
            demo_mode: true,
            sandbox_mode: true,
            api_key: String::new(),
            api_secret: String::new(),
            serie_id: String::new(),
            auto_generate: false,
            auto_generate_delay: Duration::from_secs(5),
            send_email: true,
            tax: TaxDefaults::default(),
        }
    }
}

impl InvoicingSettings {
    /// Reads a fresh snapshot from the configuration provider
    pub fn load(provider: &dyn ConfigProvider) -> AppResult<Self> {
        let get = |name: &str| provider.get(name, default_for(name));

        let tasa_iva_raw = get(keys::TASA_IVA)?;
        let tasa_iva = tasa_iva_raw.trim().parse::<f64>().map_err(|e| {
            AppError::Other(format!("Invalid {} '{}': {}", keys::TASA_IVA, tasa_iva_raw, e))
        })?;

        let delay_raw = get(keys::AUTO_GENERATE_DELAY_SECS)?;
        let delay_secs = delay_raw.trim().parse::<u64>().map_err(|e| {
            AppError::Other(format!(
                "Invalid {} '{}': {}",
                keys::AUTO_GENERATE_DELAY_SECS,
                delay_raw,
                e
            ))
        })?;

        Ok(Self {
            demo_mode: is_yes(&get(keys::DEMO_MODE)?),
            sandbox_mode: is_yes(&get(keys::SANDBOX_MODE)?),
            api_key: get(keys::API_KEY)?.trim().to_string(),
            api_secret: get(keys::API_SECRET)?.trim().to_string(),
            serie_id: get(keys::SERIE_ID)?.trim().to_string(),
            auto_generate: is_yes(&get(keys::AUTO_GENERATE)?),
            auto_generate_delay: Duration::from_secs(delay_secs),
            send_email: is_yes(&get(keys::SEND_EMAIL)?),
            tax: TaxDefaults {
                uso_cfdi: get(keys::USO_CFDI)?,
                forma_pago: get(keys::FORMA_PAGO)?,
                metodo_pago: get(keys::METODO_PAGO)?,
                clave_prod_serv: get(keys::CLAVE_PROD_SERV)?,
                clave_unidad: get(keys::CLAVE_UNIDAD)?,
                unidad: get(keys::UNIDAD)?,
                tasa_iva,
                lugar_expedicion: get(keys::LUGAR_EXPEDICION)?,
            },
        })
    }

    /// Checks what real (non-demo) mode needs; the first missing item wins.
    pub fn validate_for_real_mode(&self) -> Result<(), String> {
        if self.api_key.is_empty() {
            return Err("API key is not configured".to_string());
        }
        if self.api_secret.is_empty() {
            return Err("API secret is not configured".to_string());
        }
        if self.serie_id.is_empty() {
            return Err("Serie ID is not configured".to_string());
        }
        Ok(())
    }

    pub fn credentials(&self) -> ApiCredentials {
        ApiCredentials {
            api_key: self.api_key.clone(),
            api_secret: self.api_secret.clone(),
            sandbox: self.sandbox_mode,
        }
    }

    /// Environment a newly generated CFDI would be recorded under
    pub fn environment(&self) -> CfdiEnvironment {
        if self.demo_mode {
            CfdiEnvironment::Demo
        } else if self.sandbox_mode {
            CfdiEnvironment::Sandbox
        } else {
            CfdiEnvironment::Production
        }
    }
}

/// Options store booleans as "yes"/"no"
pub fn is_yes(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "yes" | "true" | "1" | "on")
}
