// src/application/mod.rs
//
// Application Layer
//
// ARCHITECTURE:
// - Boundary between a host surface (CLI, admin UI) and the services
// - Translates between DTOs and domain types
// - Every command returns a serializable value or a JSON error string

pub mod commands;
pub mod dto;
pub mod error_handling;
pub mod state;

pub use commands::*;
pub use dto::*;
pub use error_handling::{ErrorResponse, ErrorType, ToErrorResponse};
pub use state::AppState;
