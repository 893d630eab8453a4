// events/types.rs
//
// Invoicing domain events.
// Each event represents an immutable fact that has already occurred.
//
// CRITICAL RULES:
// - Events are facts, not commands
// - Events carry only the data needed to react
// - No business logic in event types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{CfdiEnvironment, OrderId};

/// Trait that all domain events must implement
pub trait DomainEvent: std::fmt::Debug + Clone {
    /// Unique identifier for this event instance
    fn event_id(&self) -> Uuid;

    /// When this event occurred
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Human-readable event type name
    fn event_type(&self) -> &'static str;
}

macro_rules! domain_event {
    ($name:ident) => {
        impl DomainEvent for $name {
            fn event_id(&self) -> Uuid {
                self.event_id
            }
            fn occurred_at(&self) -> DateTime<Utc> {
                self.occurred_at
            }
            fn event_type(&self) -> &'static str {
                stringify!($name)
            }
        }
    };
}

// ============================================================================
// ORDER EVENTS
// ============================================================================

/// Emitted when the host reports an order as completed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCompleted {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub order_id: OrderId,
    /// Whether an automatic generation was scheduled
    pub auto_generate_scheduled: bool,
}

impl OrderCompleted {
    pub fn new(order_id: OrderId, auto_generate_scheduled: bool) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            order_id,
            auto_generate_scheduled,
        }
    }
}

domain_event!(OrderCompleted);

// ============================================================================
// CFDI EVENTS
// ============================================================================

/// Emitted after a CFDI is issued and stored on the order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CfdiGenerated {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub order_id: OrderId,
    pub uuid: String,
    pub serie: String,
    pub folio: String,
    pub environment: CfdiEnvironment,
}

impl CfdiGenerated {
    pub fn new(
        order_id: OrderId,
        uuid: String,
        serie: String,
        folio: String,
        environment: CfdiEnvironment,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            order_id,
            uuid,
            serie,
            folio,
            environment,
        }
    }
}

domain_event!(CfdiGenerated);

/// Emitted after an active CFDI is marked cancelled
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CfdiCancelled {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub order_id: OrderId,
    pub uuid: String,
    pub environment: CfdiEnvironment,
}

impl CfdiCancelled {
    pub fn new(order_id: OrderId, uuid: String, environment: CfdiEnvironment) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            order_id,
            uuid,
            environment,
        }
    }
}

domain_event!(CfdiCancelled);

/// Emitted when a generation attempt ends without a CFDI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CfdiGenerationFailed {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub order_id: OrderId,
    pub error_code: String,
    pub reason: String,
}

impl CfdiGenerationFailed {
    pub fn new(order_id: OrderId, error_code: &str, reason: String) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            order_id,
            error_code: error_code.to_string(),
            reason,
        }
    }
}

domain_event!(CfdiGenerationFailed);
