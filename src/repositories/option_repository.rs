// src/repositories/option_repository.rs
//
// Named option storage (administrator settings)

use std::sync::Arc;

use rusqlite::{params, OptionalExtension};

use crate::db::ConnectionPool;
use crate::error::AppResult;

/// Read access to named configuration options
pub trait ConfigProvider: Send + Sync {
    /// Stored value of `name`, or `default` when unset
    fn get(&self, name: &str, default: &str) -> AppResult<String>;
}

pub struct SqliteOptionRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteOptionRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    pub fn set(&self, name: &str, value: &str) -> AppResult<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO options (name, value) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET value = excluded.value",
            params![name, value],
        )?;
        Ok(())
    }

    /// Inserts each default that has no stored value yet.
    ///
    /// Returns how many options were added.
    pub fn seed_defaults(&self, defaults: &[(&str, &str)]) -> AppResult<usize> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt =
                tx.prepare("INSERT OR IGNORE INTO options (name, value) VALUES (?1, ?2)")?;
            for (name, value) in defaults {
                inserted += stmt.execute(params![name, value])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    pub fn list_all(&self) -> AppResult<Vec<(String, String)>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT name, value FROM options ORDER BY name")?;
        let options = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(options)
    }
}

impl ConfigProvider for SqliteOptionRepository {
    fn get(&self, name: &str, default: &str) -> AppResult<String> {
        let conn = self.pool.get()?;
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM options WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.unwrap_or_else(|| default.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_OPTIONS;
    use crate::db::create_test_pool;

    fn repo() -> SqliteOptionRepository {
        SqliteOptionRepository::new(Arc::new(create_test_pool().unwrap()))
    }

    #[test]
    fn test_get_falls_back_to_default() {
        let repo = repo();
        assert_eq!(repo.get("demo_mode", "yes").unwrap(), "yes");
    }

    #[test]
    fn test_set_overwrites() {
        let repo = repo();
        repo.set("demo_mode", "yes").unwrap();
        repo.set("demo_mode", "no").unwrap();
        assert_eq!(repo.get("demo_mode", "yes").unwrap(), "no");
    }

    #[test]
    fn test_seed_defaults_keeps_existing_values() {
        let repo = repo();
        repo.set("demo_mode", "no").unwrap();

        let inserted = repo.seed_defaults(&DEFAULT_OPTIONS).unwrap();
        assert_eq!(inserted, DEFAULT_OPTIONS.len() - 1);
        assert_eq!(repo.get("demo_mode", "yes").unwrap(), "no");
        assert_eq!(repo.get("uso_cfdi", "").unwrap(), "G01");

        // Second run is a no-op
        assert_eq!(repo.seed_defaults(&DEFAULT_OPTIONS).unwrap(), 0);
        assert_eq!(repo.list_all().unwrap().len(), DEFAULT_OPTIONS.len());
    }
}
