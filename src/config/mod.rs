// src/config/mod.rs
//
// Configuration
//
// - Invoicing options: read from the options store on every workflow call
// - Process configuration (database path): resolved by the binary

pub mod settings;

pub use settings::{
    is_yes, keys, ApiCredentials, InvoicingSettings, TaxDefaults, DEFAULT_OPTIONS,
};
