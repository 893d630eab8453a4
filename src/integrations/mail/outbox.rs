// src/integrations/mail/outbox.rs
//
// SQLite-backed email outbox

use std::sync::Arc;

use chrono::Utc;
use rusqlite::params;
use serde::Serialize;

use super::Notifier;
use crate::db::ConnectionPool;
use crate::domain::{CfdiArtifacts, Order, OrderId};
use crate::error::{AppError, AppResult};

/// A queued message as stored in `email_outbox`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboxEmail {
    pub id: i64,
    pub order_id: OrderId,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub created_at: String,
    pub sent_at: Option<String>,
}

pub struct SqliteEmailOutbox {
    pool: Arc<ConnectionPool>,
}

impl SqliteEmailOutbox {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    /// Messages the host mailer has not picked up yet, oldest first
    pub fn pending(&self) -> AppResult<Vec<OutboxEmail>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, order_id, recipient, subject, body, created_at, sent_at
             FROM email_outbox WHERE sent_at IS NULL ORDER BY id",
        )?;
        let emails = stmt
            .query_map([], |row| {
                Ok(OutboxEmail {
                    id: row.get(0)?,
                    order_id: OrderId(row.get(1)?),
                    recipient: row.get(2)?,
                    subject: row.get(3)?,
                    body: row.get(4)?,
                    created_at: row.get(5)?,
                    sent_at: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(emails)
    }

    pub fn mark_sent(&self, id: i64) -> AppResult<()> {
        let conn = self.pool.get()?;
        let updated = conn.execute(
            "UPDATE email_outbox SET sent_at = ?2 WHERE id = ?1",
            params![id, Utc::now().to_rfc3339()],
        )?;
        if updated == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    fn compose(order: &Order, artifacts: &CfdiArtifacts) -> (String, String) {
        let subject = format!("Tu factura del pedido #{}", order.id);

        let mut body = format!(
            "Hola {},\n\nTu factura electrónica (CFDI) del pedido #{} está lista.\n\nUUID: {}\n",
            order.billing.name, order.id, artifacts.uuid
        );
        if let Some(pdf) = &artifacts.pdf_url {
            body.push_str(&format!("PDF: {}\n", pdf));
        }
        if let Some(xml) = &artifacts.xml_url {
            body.push_str(&format!("XML: {}\n", xml));
        }
        body.push_str("\nGracias por tu compra.\n");

        (subject, body)
    }
}

impl Notifier for SqliteEmailOutbox {
    fn send_cfdi_email(&self, order: &Order, artifacts: &CfdiArtifacts) -> AppResult<()> {
        let recipient = order
            .billing
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AppError::Other(format!("Order {} has no billing email", order.id)))?;

        let (subject, body) = Self::compose(order, artifacts);

        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO email_outbox (order_id, recipient, subject, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![order.id.0, recipient, subject, body, Utc::now().to_rfc3339()],
        )?;

        log::info!("Queued CFDI email for order {} to {}", order.id, recipient);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::domain::{BillingDetails, LineItem};
    use crate::repositories::{OrderRepository, SqliteOrderRepository};

    fn setup(email: Option<&str>) -> (SqliteEmailOutbox, Order) {
        let pool = Arc::new(create_test_pool().unwrap());
        let billing = BillingDetails {
            name: "Ana".to_string(),
            email: email.map(str::to_string),
            ..Default::default()
        };
        let order = Order::new(OrderId(8), billing, vec![LineItem::new("Mug", 1.0, 10.0)]);
        SqliteOrderRepository::new(Arc::clone(&pool))
            .insert(&order)
            .unwrap();
        (SqliteEmailOutbox::new(pool), order)
    }

    fn artifacts() -> CfdiArtifacts {
        CfdiArtifacts {
            uuid: "u-1".to_string(),
            pdf_url: Some("https://factura.com/demo/cfdi/u-1.pdf".to_string()),
            xml_url: None,
        }
    }

    #[test]
    fn test_email_is_queued_with_links() {
        let (outbox, order) = setup(Some("ana@example.test"));
        outbox.send_cfdi_email(&order, &artifacts()).unwrap();

        let pending = outbox.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].recipient, "ana@example.test");
        assert!(pending[0].subject.contains("#8"));
        assert!(pending[0].body.contains("UUID: u-1"));
        assert!(pending[0].body.contains("u-1.pdf"));
        assert!(!pending[0].body.contains("XML:"));
    }

    #[test]
    fn test_missing_email_is_an_error() {
        let (outbox, order) = setup(None);
        assert!(outbox.send_cfdi_email(&order, &artifacts()).is_err());
        assert!(outbox.pending().unwrap().is_empty());
    }

    #[test]
    fn test_mark_sent() {
        let (outbox, order) = setup(Some("ana@example.test"));
        outbox.send_cfdi_email(&order, &artifacts()).unwrap();
        let id = outbox.pending().unwrap()[0].id;

        outbox.mark_sent(id).unwrap();
        assert!(outbox.pending().unwrap().is_empty());
        assert!(matches!(outbox.mark_sent(999), Err(AppError::NotFound)));
    }
}
