// src/events/mod.rs
//
// Internal Event System - Public API
//
// CRITICAL: the erased handler type is INTERNAL and must NOT be exported

pub mod bus;
pub mod handlers;
pub mod types;

pub use types::{CfdiCancelled, CfdiGenerated, CfdiGenerationFailed, DomainEvent, OrderCompleted};

pub use bus::{EventBus, EventLogEntry};

pub use handlers::register_audit_handlers;

/// Initialize a new event bus
pub fn create_event_bus() -> EventBus {
    EventBus::new()
}
