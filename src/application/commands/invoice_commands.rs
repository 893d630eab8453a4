// src/application/commands/invoice_commands.rs

use crate::application::error_handling::{ErrorResponse, ToErrorResponse};
use crate::application::{dto::*, state::AppState};
use crate::domain::{CfdiResult, OrderId};
use crate::error::InvoiceError;
use crate::integrations::mail::OutboxEmail;
use crate::repositories::InvoiceEventRecord;

/// Generate (or regenerate) the CFDI of an order
pub async fn generate_cfdi(dto: GenerateCfdiDto, state: &AppState) -> CfdiResult {
    let order_id = OrderId(dto.order_id);
    if dto.regenerate {
        state.invoice_service.regenerate_cfdi(order_id).await
    } else {
        state.invoice_service.generate_cfdi_for_order(order_id).await
    }
}

/// Cancel the active CFDI of an order
pub async fn cancel_cfdi(order_id: i64, state: &AppState) -> CfdiResult {
    state.invoice_service.cancel_cfdi(OrderId(order_id)).await
}

/// Host hook: the order reached "completed"
///
/// With `wait`, blocks until the automatic generation (if any) has run.
pub async fn order_completed(
    order_id: i64,
    wait: bool,
    state: &AppState,
) -> Result<OrderCompletedDto, String> {
    let handle = state.invoice_service.on_order_completed(OrderId(order_id));
    let scheduled = handle.is_some();

    let result = match handle {
        Some(handle) if wait => Some(handle.await.map_err(|e| {
            log::error!("Automatic generation task for order {} failed: {}", order_id, e);
            ErrorResponse::validation(format!("Automatic generation did not finish: {}", e))
                .to_json()
        })?),
        _ => None,
    };

    Ok(OrderCompletedDto {
        order_id,
        scheduled,
        result,
    })
}

pub async fn get_invoice_status(
    order_id: i64,
    state: &AppState,
) -> Result<InvoiceStatusDto, String> {
    state
        .invoice_service
        .invoice_status(OrderId(order_id))
        .map(InvoiceStatusDto::from)
        .to_error_response()
}

/// Recorded invoicing events of an order, oldest first
pub async fn get_invoice_history(
    order_id: i64,
    state: &AppState,
) -> Result<Vec<InvoiceEventRecord>, String> {
    let order_id = OrderId(order_id);
    if state.orders.get(order_id).to_error_response()?.is_none() {
        return Err(ErrorResponse::from_invoice_error(InvoiceError::OrderNotFound).to_json());
    }
    state.history.list_for_order(order_id).to_error_response()
}

/// Queued customer emails not yet delivered by the host mailer
pub async fn list_pending_emails(state: &AppState) -> Result<Vec<OutboxEmail>, String> {
    state.outbox.pending().to_error_response()
}

pub async fn mark_email_sent(id: i64, state: &AppState) -> Result<(), String> {
    state.outbox.mark_sent(id).to_error_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::domain::{BillingDetails, LineItem, Order};
    use crate::integrations::facturacom::transport::MockHttpTransport;
    use std::sync::Arc;

    fn state() -> AppState {
        let mut transport = MockHttpTransport::new();
        transport.expect_send().never();
        let state =
            AppState::new(Arc::new(create_test_pool().unwrap()), Arc::new(transport)).unwrap();

        let billing = BillingDetails {
            name: "Público".to_string(),
            rfc: Some("XAXX010101000".to_string()),
            ..Default::default()
        };
        let order = Order::new(OrderId(42), billing, vec![LineItem::new("Mug", 1.0, 99.0)]);
        state.orders.insert(&order).unwrap();
        state
    }

    #[tokio::test]
    async fn test_generate_then_status() {
        let state = state();

        let result = generate_cfdi(
            GenerateCfdiDto {
                order_id: 42,
                regenerate: false,
            },
            &state,
        )
        .await;
        assert!(result.is_success());

        let status = get_invoice_status(42, &state).await.unwrap();
        assert_eq!(status.state, "active");
        assert_eq!(status.uuid.as_deref(), result.uuid());
        assert_eq!(status.environment.as_deref(), Some("demo"));
    }

    #[tokio::test]
    async fn test_regenerate_flag() {
        let state = state();
        let dto = GenerateCfdiDto {
            order_id: 42,
            regenerate: false,
        };
        let first = generate_cfdi(dto.clone(), &state).await;

        let second = generate_cfdi(
            GenerateCfdiDto {
                regenerate: true,
                ..dto
            },
            &state,
        )
        .await;

        assert!(second.is_success());
        assert_ne!(first.uuid(), second.uuid());
    }

    #[tokio::test]
    async fn test_cancel_without_invoice() {
        let state = state();
        let result = cancel_cfdi(42, &state).await;
        assert_eq!(result.error_code(), Some("no_active_invoice"));
    }

    #[tokio::test]
    async fn test_status_of_unknown_order_is_json_error() {
        let state = state();
        let err = get_invoice_status(7, &state).await.unwrap_err();
        let response: ErrorResponse = serde_json::from_str(&err).unwrap();
        assert_eq!(response.details.as_deref(), Some("order_not_found"));
    }

    #[tokio::test]
    async fn test_order_completed_defaults_to_manual() {
        let state = state();
        let dto = order_completed(42, true, &state).await.unwrap();
        assert!(!dto.scheduled);
        assert!(dto.result.is_none());
    }

    #[tokio::test]
    async fn test_history_follows_the_invoice_lifecycle() {
        let state = state();
        let generated = generate_cfdi(
            GenerateCfdiDto {
                order_id: 42,
                regenerate: false,
            },
            &state,
        )
        .await;
        cancel_cfdi(42, &state).await;

        let history = get_invoice_history(42, &state).await.unwrap();
        let types: Vec<_> = history.iter().map(|r| r.event_type.as_str()).collect();
        assert_eq!(types, vec!["CfdiGenerated", "CfdiCancelled"]);
        assert_eq!(history[0].payload["uuid"].as_str(), generated.uuid());
        assert_eq!(history[1].payload["environment"], "demo");
    }

    #[tokio::test]
    async fn test_history_of_unknown_order_is_json_error() {
        let state = state();
        let err = get_invoice_history(7, &state).await.unwrap_err();
        let response: ErrorResponse = serde_json::from_str(&err).unwrap();
        assert_eq!(response.details.as_deref(), Some("order_not_found"));
    }

    #[tokio::test]
    async fn test_demo_generation_queues_no_email() {
        let state = state();
        generate_cfdi(
            GenerateCfdiDto {
                order_id: 42,
                regenerate: false,
            },
            &state,
        )
        .await;
        assert!(list_pending_emails(&state).await.unwrap().is_empty());
    }
}
