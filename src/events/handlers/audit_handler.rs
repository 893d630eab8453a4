// src/events/handlers/audit_handler.rs
//
// Keeps a durable per-order history of every invoicing event.
//
// RULES:
// - Records events, never reacts to them
// - A storage failure is logged and does not reach the emitter

use std::sync::Arc;

use serde::Serialize;

use crate::domain::OrderId;
use crate::events::{
    CfdiCancelled, CfdiGenerated, CfdiGenerationFailed, DomainEvent, EventBus, OrderCompleted,
};
use crate::repositories::{InvoiceEventLog, InvoiceEventRecord};

// ============================================================================
// HANDLER REGISTRATION
// ============================================================================

/// Subscribes the event log to every invoicing event
pub fn register_audit_handlers(bus: &EventBus, history: Arc<dyn InvoiceEventLog>) {
    let completed_history = Arc::clone(&history);
    bus.subscribe::<OrderCompleted, _>(move |event| {
        record_event(completed_history.as_ref(), event, event.order_id);
    });

    let generated_history = Arc::clone(&history);
    bus.subscribe::<CfdiGenerated, _>(move |event| {
        record_event(generated_history.as_ref(), event, event.order_id);
    });

    let cancelled_history = Arc::clone(&history);
    bus.subscribe::<CfdiCancelled, _>(move |event| {
        record_event(cancelled_history.as_ref(), event, event.order_id);
    });

    bus.subscribe::<CfdiGenerationFailed, _>(move |event| {
        record_event(history.as_ref(), event, event.order_id);
    });

    log::debug!("[AUDIT] Handlers registered");
}

fn record_event<E>(history: &dyn InvoiceEventLog, event: &E, order_id: OrderId)
where
    E: DomainEvent + Serialize,
{
    let payload = match serde_json::to_value(event) {
        Ok(payload) => payload,
        Err(e) => {
            log::warn!("[AUDIT] Could not serialize {}: {}", event.event_type(), e);
            return;
        }
    };

    let record = InvoiceEventRecord {
        event_id: event.event_id().to_string(),
        event_type: event.event_type().to_string(),
        order_id,
        payload,
        occurred_at: event.occurred_at(),
    };

    match history.record(&record) {
        Ok(true) => {}
        Ok(false) => {
            log::debug!("[AUDIT] {} {} already recorded", record.event_type, record.event_id)
        }
        Err(e) => log::warn!(
            "[AUDIT] Failed to record {} for order {}: {}",
            record.event_type,
            order_id,
            e
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::domain::CfdiEnvironment;
    use crate::error::{AppError, AppResult};
    use crate::repositories::SqliteInvoiceEventLog;

    fn log_with_order(id: i64) -> Arc<SqliteInvoiceEventLog> {
        let pool = Arc::new(create_test_pool().unwrap());
        pool.get()
            .unwrap()
            .execute(
                "INSERT INTO orders (id, status, billing_name, created_at)
                 VALUES (?1, 'completed', 'Ana', '2026-01-01T00:00:00Z')",
                [id],
            )
            .unwrap();
        Arc::new(SqliteInvoiceEventLog::new(pool))
    }

    #[test]
    fn test_every_invoicing_event_is_recorded() {
        let bus = EventBus::new();
        let log = log_with_order(12);
        register_audit_handlers(&bus, log.clone());

        bus.emit(OrderCompleted::new(OrderId(12), true));
        bus.emit(CfdiGenerationFailed::new(
            OrderId(12),
            "api_error",
            "Factura.com rejected the request".to_string(),
        ));
        bus.emit(CfdiGenerated::new(
            OrderId(12),
            "U-12".to_string(),
            "F".to_string(),
            "120".to_string(),
            CfdiEnvironment::Sandbox,
        ));
        bus.emit(CfdiCancelled::new(OrderId(12), "U-12".to_string(), CfdiEnvironment::Sandbox));

        let history = log.list_for_order(OrderId(12)).unwrap();
        let types: Vec<_> = history.iter().map(|r| r.event_type.as_str()).collect();
        assert_eq!(
            types,
            vec!["OrderCompleted", "CfdiGenerationFailed", "CfdiGenerated", "CfdiCancelled"]
        );
        assert_eq!(history[1].payload["error_code"], "api_error");
        assert_eq!(history[2].payload["uuid"], "U-12");
    }

    struct BrokenLog;

    impl InvoiceEventLog for BrokenLog {
        fn record(&self, _record: &InvoiceEventRecord) -> AppResult<bool> {
            Err(AppError::Other("disk full".to_string()))
        }

        fn list_for_order(&self, _order_id: OrderId) -> AppResult<Vec<InvoiceEventRecord>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_storage_failure_does_not_fail_the_emission() {
        let bus = EventBus::new();
        register_audit_handlers(&bus, Arc::new(BrokenLog));

        bus.emit(OrderCompleted::new(OrderId(1), false));

        let entry = &bus.emitted()[0];
        assert_eq!(entry.handler_count, 1);
        assert_eq!(entry.failed_handlers, 0);
    }
}
