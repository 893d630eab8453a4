// src/application/commands/mod.rs
//
// Command Handlers
//
// ARCHITECTURE:
// - Commands are thin adapters between a host surface and the services
// - Commands accept DTOs, return DTOs
// - Commands handle error conversion (JSON error strings)
// - Commands NEVER contain business logic

pub mod invoice_commands;
pub mod settings_commands;

pub use invoice_commands::*;
pub use settings_commands::*;
