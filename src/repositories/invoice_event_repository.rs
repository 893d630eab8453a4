// src/repositories/invoice_event_repository.rs
//
// Durable history of invoicing events, one row per event

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::Serialize;

use crate::db::ConnectionPool;
use crate::domain::OrderId;
use crate::error::{AppError, AppResult};

/// One stored invoicing event
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceEventRecord {
    pub event_id: String,
    pub event_type: String,
    pub order_id: OrderId,
    /// The event as emitted, serialized
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

pub trait InvoiceEventLog: Send + Sync {
    /// Stores `record`; a second record with the same event id is ignored.
    ///
    /// Returns false when the event was already stored.
    fn record(&self, record: &InvoiceEventRecord) -> AppResult<bool>;

    /// Events of one order, oldest first
    fn list_for_order(&self, order_id: OrderId) -> AppResult<Vec<InvoiceEventRecord>>;
}

pub struct SqliteInvoiceEventLog {
    pool: Arc<ConnectionPool>,
}

impl SqliteInvoiceEventLog {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }
}

impl InvoiceEventLog for SqliteInvoiceEventLog {
    fn record(&self, record: &InvoiceEventRecord) -> AppResult<bool> {
        let conn = self.pool.get()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO cfdi_events (event_id, event_type, order_id, payload, occurred_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.event_id,
                record.event_type,
                record.order_id.0,
                record.payload.to_string(),
                record.occurred_at.to_rfc3339(),
            ],
        )?;
        Ok(inserted == 1)
    }

    fn list_for_order(&self, order_id: OrderId) -> AppResult<Vec<InvoiceEventRecord>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT event_id, event_type, payload, occurred_at FROM cfdi_events
             WHERE order_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![order_id.0], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(event_id, event_type, payload, occurred_at)| {
                let occurred_at = DateTime::parse_from_rfc3339(&occurred_at)
                    .map_err(|e| AppError::Other(format!("Invalid event timestamp: {}", e)))?
                    .with_timezone(&Utc);
                Ok(InvoiceEventRecord {
                    event_id,
                    event_type,
                    order_id,
                    payload: serde_json::from_str(&payload)?,
                    occurred_at,
                })
            })
            .collect()
    }
}
