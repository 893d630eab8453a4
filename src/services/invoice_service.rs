// src/services/invoice_service.rs
//
// Invoice Service - CFDI workflow controller
//
// CRITICAL RULES:
// - The only component with invoicing business rules
// - Invoice state is derived from order metadata, never stored separately
// - One settings snapshot per operation
// - Every CFDI write goes through a compare-and-save on cfdi_uuid
// - Operations never return Err: failures become CfdiResult::failure
// - Email and notes are best-effort once the CFDI is persisted

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::InvoicingSettings;
use crate::domain::{
    meta, normalize_rfc, CfdiArtifacts, CfdiEnvironment, CfdiRecord, CfdiResult, DomainError,
    InvoiceState, IssuedCfdi, Order, OrderId,
};
use crate::error::{ApiError, AppError, InvoiceError, InvoiceResult};
use crate::events::{CfdiCancelled, CfdiGenerated, CfdiGenerationFailed, EventBus, OrderCompleted};
use crate::integrations::facturacom::{ClientConfig, InvoicingApiFactory};
use crate::integrations::mail::Notifier;
use crate::repositories::{ConfigProvider, OrderRepository};

pub const DEMO_SERIE: &str = "DEMO";
const DEMO_ARTIFACT_BASE: &str = "https://factura.com/demo/cfdi/";

/// Current invoice situation of an order, for admin display
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceStatus {
    pub order_id: OrderId,
    pub state: InvoiceState,
    pub record: Option<CfdiRecord>,
}

pub struct InvoiceService {
    order_repo: Arc<dyn OrderRepository>,
    config: Arc<dyn ConfigProvider>,
    api_factory: Arc<dyn InvoicingApiFactory>,
    notifier: Arc<dyn Notifier>,
    event_bus: Arc<EventBus>,
}

impl InvoiceService {
    pub fn new(
        order_repo: Arc<dyn OrderRepository>,
        config: Arc<dyn ConfigProvider>,
        api_factory: Arc<dyn InvoicingApiFactory>,
        notifier: Arc<dyn Notifier>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            order_repo,
            config,
            api_factory,
            notifier,
            event_bus,
        }
    }

    // ========================================================================
    // PUBLIC OPERATIONS
    // ========================================================================

    /// Issues a CFDI for an order without an active one
    pub async fn generate_cfdi_for_order(&self, order_id: OrderId) -> CfdiResult {
        match self.generate(order_id).await {
            Ok(issued) => CfdiResult::generated(issued, "CFDI generated successfully"),
            Err(e) => {
                self.log_failure("generate", order_id, &e);
                self.event_bus
                    .emit(CfdiGenerationFailed::new(order_id, e.code(), e.to_string()));
                CfdiResult::failure(e.code(), e.user_message())
            }
        }
    }

    /// Marks the active CFDI cancelled, cancelling it with the provider first
    /// when it was issued for real
    pub async fn cancel_cfdi(&self, order_id: OrderId) -> CfdiResult {
        match self.cancel(order_id).await {
            Ok(cancelled) => CfdiResult::cancelled(cancelled, "CFDI cancelled successfully"),
            Err(e) => {
                self.log_failure("cancel", order_id, &e);
                CfdiResult::failure(e.code(), e.user_message())
            }
        }
    }

    /// Cancels the active CFDI (if any) and issues a new one
    ///
    /// A failed cancellation aborts before anything is generated.
    pub async fn regenerate_cfdi(&self, order_id: OrderId) -> CfdiResult {
        match self.cancel(order_id).await {
            Ok(_) | Err(InvoiceError::NoActiveInvoice) => {}
            Err(e) => {
                self.log_failure("regenerate", order_id, &e);
                return CfdiResult::failure(e.code(), e.user_message());
            }
        }
        self.generate_cfdi_for_order(order_id).await
    }

    /// Entry point for the host's "order completed" hook
    ///
    /// Schedules one deferred generation when auto-generate is on and the
    /// order has no active CFDI. Aborting the returned task just means no
    /// automatic invoice; manual generation stays available.
    pub fn on_order_completed(self: &Arc<Self>, order_id: OrderId) -> Option<JoinHandle<CfdiResult>> {
        let scheduled = match self.should_auto_generate(order_id) {
            Ok(delay) => delay,
            Err(e) => {
                log::warn!("Order {}: auto-generate check failed: {}", order_id, e);
                None
            }
        };

        self.event_bus
            .emit(OrderCompleted::new(order_id, scheduled.is_some()));

        let delay = scheduled?;
        log::info!(
            "Order {}: automatic CFDI generation scheduled in {:?}",
            order_id,
            delay
        );

        let service = Arc::clone(self);
        Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let result = service.generate_cfdi_for_order(order_id).await;
            let note = match (result.is_success(), result.uuid()) {
                (true, Some(uuid)) => format!("CFDI generated automatically. UUID: {}", uuid),
                _ => format!(
                    "Automatic CFDI generation failed: {}",
                    result.error().unwrap_or("unknown error")
                ),
            };
            service.append_note(order_id, &note);
            result
        }))
    }

    pub fn invoice_status(&self, order_id: OrderId) -> InvoiceResult<InvoiceStatus> {
        let order = self.load_order(order_id)?;
        Ok(InvoiceStatus {
            order_id,
            state: InvoiceState::of(&order),
            record: CfdiRecord::from_order(&order),
        })
    }

    // ========================================================================
    // WORKFLOW STEPS
    // ========================================================================

    async fn generate(&self, order_id: OrderId) -> InvoiceResult<IssuedCfdi> {
        let mut order = self.load_order(order_id)?;

        if InvoiceState::of(&order) == InvoiceState::Active {
            return Err(InvoiceError::AlreadyInvoiced);
        }
        // A cancelled CFDI keeps its uuid; the guarded save compares against it
        let observed_uuid = order.get_meta(meta::UUID).map(str::to_string);

        let settings = self.load_settings()?;
        if !settings.demo_mode {
            settings
                .validate_for_real_mode()
                .map_err(InvoiceError::ConfigurationInvalid)?;
        }

        let api = self.api_factory.build(ClientConfig::from(&settings));
        let payload = api
            .prepare_cfdi_data(&order)
            .map_err(|DomainError::Validation(reason)| InvoiceError::PayloadError(reason))?;

        let (issued, environment, audit_key, audit_value) = if settings.demo_mode {
            let payload_json = serde_json::to_string(&payload)
                .map_err(|e| InvoiceError::Storage(AppError::Serialization(e)))?;
            (demo_cfdi(), CfdiEnvironment::Demo, meta::DEMO_PAYLOAD, payload_json)
        } else {
            let response = api.create_cfdi(&payload).await?;
            let issued = response.issued().ok_or(InvoiceError::MissingUuid)?;
            (
                issued,
                settings.environment(),
                meta::API_RESPONSE,
                response.raw.to_string(),
            )
        };

        let record = CfdiRecord {
            cfdi: issued.clone(),
            environment,
            generated_at: Utc::now(),
            cancelled_at: None,
            rfc_used: order.billing.rfc.as_deref().map(normalize_rfc),
        };
        record.write_to(&mut order);
        order.remove_meta(meta::API_RESPONSE);
        order.remove_meta(meta::DEMO_PAYLOAD);
        order.set_meta(audit_key, audit_value);

        if !self
            .order_repo
            .compare_and_save(&order, meta::UUID, observed_uuid.as_deref())?
        {
            log::warn!(
                "Order {}: CFDI {} discarded, another generation landed first",
                order_id,
                issued.uuid
            );
            return Err(InvoiceError::AlreadyInvoiced);
        }

        log::info!(
            "Order {}: CFDI {} generated ({})",
            order_id,
            issued.uuid,
            environment.label()
        );

        self.append_note(
            order_id,
            &format!(
                "CFDI generated ({}). UUID: {}, Serie-Folio: {}",
                environment.label(),
                issued.uuid,
                record.serie_folio()
            ),
        );

        if settings.send_email && !settings.demo_mode {
            if let Err(e) = self
                .notifier
                .send_cfdi_email(&order, &CfdiArtifacts::from(&issued))
            {
                log::warn!("Order {}: CFDI email not sent: {}", order_id, e);
            }
        }

        self.event_bus.emit(CfdiGenerated::new(
            order_id,
            issued.uuid.clone(),
            issued.serie.clone(),
            issued.folio.clone(),
            environment,
        ));

        Ok(issued)
    }

    async fn cancel(&self, order_id: OrderId) -> InvoiceResult<IssuedCfdi> {
        let mut order = self.load_order(order_id)?;

        let mut record = match InvoiceState::of(&order) {
            InvoiceState::Active => {
                CfdiRecord::from_order(&order).ok_or(InvoiceError::NoActiveInvoice)?
            }
            _ => return Err(InvoiceError::NoActiveInvoice),
        };

        let settings = self.load_settings()?;
        let issued_for_real = record.environment != CfdiEnvironment::Demo;

        let provider_skipped = issued_for_real && settings.demo_mode;
        if issued_for_real && !settings.demo_mode {
            settings
                .validate_for_real_mode()
                .map_err(InvoiceError::ConfigurationInvalid)?;
            let api = self.api_factory.build(ClientConfig::from(&settings));
            api.cancel_cfdi(&record.cfdi.uuid).await?;
        } else if provider_skipped {
            log::warn!(
                "Order {}: CFDI {} was issued in {} but demo mode is on; \
                 cancelled locally only, it stays valid at Factura.com",
                order_id,
                record.cfdi.uuid,
                record.environment.label()
            );
        }

        record.cancelled_at = Some(Utc::now());
        record.write_to(&mut order);

        let still_active = [
            (meta::UUID, Some(record.cfdi.uuid.as_str())),
            (meta::CANCELLED, None),
        ];
        if !self.order_repo.compare_all_and_save(&order, &still_active)? {
            log::warn!(
                "Order {}: CFDI {} changed during cancellation",
                order_id,
                record.cfdi.uuid
            );
            return Err(InvoiceError::NoActiveInvoice);
        }

        log::info!("Order {}: CFDI {} cancelled", order_id, record.cfdi.uuid);
        let mut note = format!(
            "CFDI cancelled. UUID: {}, Serie-Folio: {}",
            record.cfdi.uuid,
            record.serie_folio()
        );
        if provider_skipped {
            note.push_str(". Demo mode is on: not cancelled at Factura.com");
        }
        self.append_note(order_id, &note);

        self.event_bus.emit(CfdiCancelled::new(
            order_id,
            record.cfdi.uuid.clone(),
            record.environment,
        ));

        Ok(record.cfdi)
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    /// Delay to wait before generating, or `None` when nothing should run
    fn should_auto_generate(
        &self,
        order_id: OrderId,
    ) -> InvoiceResult<Option<std::time::Duration>> {
        let settings = self.load_settings()?;
        if !settings.auto_generate {
            return Ok(None);
        }

        let order = self.load_order(order_id)?;
        if InvoiceState::of(&order) == InvoiceState::Active {
            log::info!("Order {}: already invoiced, auto-generate skipped", order_id);
            return Ok(None);
        }

        Ok(Some(settings.auto_generate_delay))
    }

    fn load_order(&self, order_id: OrderId) -> InvoiceResult<Order> {
        self.order_repo
            .get(order_id)?
            .ok_or(InvoiceError::OrderNotFound)
    }

    fn load_settings(&self) -> InvoiceResult<InvoicingSettings> {
        InvoicingSettings::load(self.config.as_ref()).map_err(|e| match e {
            AppError::Other(reason) => InvoiceError::ConfigurationInvalid(reason),
            other => InvoiceError::Storage(other),
        })
    }

    /// Notes are history, not state: a failed append is logged only
    fn append_note(&self, order_id: OrderId, text: &str) {
        let result = self
            .order_repo
            .get(order_id)
            .and_then(|order| match order {
                Some(order) => self.order_repo.add_note(&order, text),
                None => Err(AppError::NotFound),
            });
        if let Err(e) = result {
            log::warn!("Order {}: could not add note: {}", order_id, e);
        }
    }

    fn log_failure(&self, operation: &str, order_id: OrderId, error: &InvoiceError) {
        match error {
            InvoiceError::Api(api) => {
                let detail = match api {
                    ApiError::HttpStatus { status, body } => format!("HTTP {}: {}", status, body),
                    other => other.to_string(),
                };
                log::error!(
                    "Order {}: {} failed, provider {} error: {}",
                    order_id,
                    operation,
                    api.kind(),
                    detail
                );
            }
            InvoiceError::MissingUuid | InvoiceError::Storage(_) => {
                log::error!("Order {}: {} failed: {}", order_id, operation, error);
            }
            _ => {
                log::info!("Order {}: {} rejected: {}", order_id, operation, error);
            }
        }
    }
}

/// A fake CFDI for demo mode; no provider involved
fn demo_cfdi() -> IssuedCfdi {
    let uuid = Uuid::new_v4().to_string();
    let folio: u32 = rand::rng().random_range(1000..=9999);
    IssuedCfdi {
        pdf_url: Some(format!("{}{}.pdf", DEMO_ARTIFACT_BASE, uuid)),
        xml_url: Some(format!("{}{}.xml", DEMO_ARTIFACT_BASE, uuid)),
        serie: DEMO_SERIE.to_string(),
        folio: folio.to_string(),
        uuid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_cfdi_shape() {
        let cfdi = demo_cfdi();
        assert_eq!(cfdi.uuid.len(), 36);
        assert_eq!(cfdi.serie, DEMO_SERIE);
        let folio: u32 = cfdi.folio.parse().unwrap();
        assert!((1000..=9999).contains(&folio));
        assert_eq!(
            cfdi.pdf_url.as_deref(),
            Some(format!("https://factura.com/demo/cfdi/{}.pdf", cfdi.uuid).as_str())
        );
    }
}
