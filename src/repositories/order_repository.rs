// src/repositories/order_repository.rs
//
// Order persistence
//
// The store owns orders; this repository is the narrow view the invoicing
// workflow needs: load an order, write its CFDI metadata under a guard,
// append notes. The store keeps writing everything else concurrently.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use crate::db::ConnectionPool;
use crate::domain::{meta, BillingDetails, LineItem, Order, OrderId, OrderNote, OrderStatus};
use crate::error::{AppError, AppResult};

/// Stored value a metadata key must still have (`None` = absent)
pub type MetaExpectation<'a> = (&'a str, Option<&'a str>);

pub trait OrderRepository: Send + Sync {
    /// Creates the order row with its items and metadata
    fn insert(&self, order: &Order) -> AppResult<()>;

    fn get(&self, id: OrderId) -> AppResult<Option<Order>>;

    /// Persists status and the whole metadata map in one transaction
    fn save(&self, order: &Order) -> AppResult<()>;

    /// Writes the order's CFDI keys only if the stored value of `key` still
    /// equals `expected` (`None` = absent). Returns `false` without writing
    /// otherwise.
    fn compare_and_save(
        &self,
        order: &Order,
        key: &str,
        expected: Option<&str>,
    ) -> AppResult<bool> {
        self.compare_all_and_save(order, &[(key, expected)])
    }

    /// Writes the order's CFDI keys only if every `(key, expected)` pair
    /// still holds. Status and metadata outside the CFDI namespace are left
    /// as stored.
    fn compare_all_and_save(
        &self,
        order: &Order,
        expected: &[MetaExpectation<'_>],
    ) -> AppResult<bool>;

    fn add_note(&self, order: &Order, text: &str) -> AppResult<()>;
}

pub struct SqliteOrderRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteOrderRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    fn row_to_order_header(row: &Row) -> Result<(OrderStatus, BillingDetails, DateTime<Utc>), rusqlite::Error> {
        let status_str: String = row.get("status")?;
        let status = status_str
            .parse::<OrderStatus>()
            .map_err(|_| rusqlite::Error::InvalidQuery)?;

        let billing = BillingDetails {
            name: row.get("billing_name")?,
            email: row.get("billing_email")?,
            rfc: row.get("billing_rfc")?,
            postal_code: row.get("billing_postal_code")?,
            tax_regime: row.get("billing_tax_regime")?,
        };

        let created_at_str: String = row.get("created_at")?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        Ok((status, billing, created_at))
    }

    fn row_to_item(row: &Row) -> Result<LineItem, rusqlite::Error> {
        Ok(LineItem {
            description: row.get("description")?,
            quantity: row.get("quantity")?,
            unit_price: row.get("unit_price")?,
            sku: row.get("sku")?,
        })
    }

    fn row_to_note(row: &Row) -> Result<OrderNote, rusqlite::Error> {
        let created_at_str: String = row.get("created_at")?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        Ok(OrderNote {
            text: row.get("note")?,
            created_at,
        })
    }

    fn load_metadata(conn: &Connection, id: OrderId) -> AppResult<BTreeMap<String, String>> {
        let mut stmt =
            conn.prepare("SELECT meta_key, meta_value FROM order_meta WHERE order_id = ?1")?;
        let rows = stmt.query_map(params![id.0], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut metadata = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            metadata.insert(key, value);
        }
        Ok(metadata)
    }

    fn write_metadata(conn: &Connection, order: &Order) -> AppResult<()> {
        conn.execute(
            "UPDATE orders SET status = ?2 WHERE id = ?1",
            params![order.id.0, order.status.to_string()],
        )?;
        conn.execute("DELETE FROM order_meta WHERE order_id = ?1", params![order.id.0])?;

        let mut stmt = conn.prepare(
            "INSERT INTO order_meta (order_id, meta_key, meta_value) VALUES (?1, ?2, ?3)",
        )?;
        for (key, value) in &order.metadata {
            stmt.execute(params![order.id.0, key, value])?;
        }
        Ok(())
    }

    /// Upserts or deletes the `cfdi_*` namespace only
    fn write_cfdi_metadata(conn: &Connection, order: &Order) -> AppResult<()> {
        let mut upsert = conn.prepare(
            "INSERT INTO order_meta (order_id, meta_key, meta_value) VALUES (?1, ?2, ?3)
             ON CONFLICT(order_id, meta_key) DO UPDATE SET meta_value = excluded.meta_value",
        )?;
        let mut delete =
            conn.prepare("DELETE FROM order_meta WHERE order_id = ?1 AND meta_key = ?2")?;

        for key in meta::CFDI_KEYS {
            match order.metadata.get(key) {
                Some(value) => upsert.execute(params![order.id.0, key, value])?,
                None => delete.execute(params![order.id.0, key])?,
            };
        }
        Ok(())
    }

    fn stored_meta(conn: &Connection, id: OrderId, key: &str) -> AppResult<Option<String>> {
        let value: Option<String> = conn
            .query_row(
                "SELECT meta_value FROM order_meta WHERE order_id = ?1 AND meta_key = ?2",
                params![id.0, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.filter(|v| !v.is_empty()))
    }
}

impl OrderRepository for SqliteOrderRepository {
    fn insert(&self, order: &Order) -> AppResult<()> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO orders (
                id, status, billing_name, billing_email, billing_rfc,
                billing_postal_code, billing_tax_regime, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                order.id.0,
                order.status.to_string(),
                order.billing.name,
                order.billing.email,
                order.billing.rfc,
                order.billing.postal_code,
                order.billing.tax_regime,
                order.created_at.to_rfc3339(),
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO order_items (order_id, position, description, quantity, unit_price, sku)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (position, item) in order.items.iter().enumerate() {
                stmt.execute(params![
                    order.id.0,
                    position as i64,
                    item.description,
                    item.quantity,
                    item.unit_price,
                    item.sku,
                ])?;
            }
        }

        Self::write_metadata(&tx, order)?;
        tx.commit()?;
        Ok(())
    }

    fn get(&self, id: OrderId) -> AppResult<Option<Order>> {
        let conn = self.pool.get()?;

        let header = conn
            .query_row(
                "SELECT * FROM orders WHERE id = ?1",
                params![id.0],
                Self::row_to_order_header,
            )
            .optional()?;

        let Some((status, billing, created_at)) = header else {
            return Ok(None);
        };

        let items = {
            let mut stmt = conn.prepare(
                "SELECT * FROM order_items WHERE order_id = ?1 ORDER BY position",
            )?;
            let items = stmt
                .query_map(params![id.0], Self::row_to_item)?
                .collect::<Result<Vec<_>, _>>()?;
            items
        };

        let notes = {
            let mut stmt =
                conn.prepare("SELECT * FROM order_notes WHERE order_id = ?1 ORDER BY id")?;
            let notes = stmt
                .query_map(params![id.0], Self::row_to_note)?
                .collect::<Result<Vec<_>, _>>()?;
            notes
        };

        let metadata = Self::load_metadata(&conn, id)?;

        Ok(Some(Order {
            id,
            status,
            billing,
            items,
            metadata,
            notes,
            created_at,
        }))
    }

    fn save(&self, order: &Order) -> AppResult<()> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        Self::write_metadata(&tx, order)?;
        tx.commit()?;
        Ok(())
    }

    fn compare_all_and_save(
        &self,
        order: &Order,
        expected: &[MetaExpectation<'_>],
    ) -> AppResult<bool> {
        let mut conn = self.pool.get()?;
        // IMMEDIATE takes the write lock up front so the reads below cannot
        // go stale before the write lands.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM orders WHERE id = ?1)",
            params![order.id.0],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(AppError::NotFound);
        }

        for (key, value) in expected {
            if Self::stored_meta(&tx, order.id, key)?.as_deref() != *value {
                return Ok(false);
            }
        }

        Self::write_cfdi_metadata(&tx, order)?;
        tx.commit()?;
        Ok(true)
    }

    fn add_note(&self, order: &Order, text: &str) -> AppResult<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO order_notes (order_id, note, created_at) VALUES (?1, ?2, ?3)",
            params![order.id.0, text, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}
