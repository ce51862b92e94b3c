//! Durable (shared) cache tier.
//!
//! Records carry their own `expires_at` bookkeeping; reads only return
//! records that have not yet expired. Writes are upserts keyed by cache key,
//! so the last writer wins.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::DurableTierError;

/// A cached value as persisted in the durable tier.
#[derive(Debug, Clone, PartialEq)]
pub struct DurableRecord {
    pub value: serde_json::Value,
    /// Milliseconds since the Unix epoch
    pub cached_at: i64,
    /// Milliseconds since the Unix epoch
    pub expires_at: i64,
}

/// Storage contract for the durable tier.
///
/// Implementations are blocking; [`crate::TieredCache`] calls them from
/// `spawn_blocking`.
pub trait DurableTier: Send + Sync {
    /// Fetch the record for `key` if its `expires_at` is strictly after `now_ms`.
    fn read(&self, key: &str, now_ms: i64) -> Result<Option<DurableRecord>, DurableTierError>;

    /// Insert or replace the record for `key`.
    fn upsert(&self, key: &str, record: &DurableRecord) -> Result<(), DurableTierError>;

    /// Delete every record whose `expires_at` is at or before `now_ms`.
    /// Returns the number of records removed.
    fn purge_expired(&self, now_ms: i64) -> Result<usize, DurableTierError>;
}

/// SQLite-backed durable tier.
pub struct SqliteDurableTier {
    conn: Mutex<Connection>,
}

impl SqliteDurableTier {
    /// Open (or create) the cache database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DurableTierError> {
        let conn = Connection::open(path)?;
        let tier = Self {
            conn: Mutex::new(conn),
        };
        tier.init_schema()?;
        Ok(tier)
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, DurableTierError> {
        let conn = Connection::open_in_memory()?;
        let tier = Self {
            conn: Mutex::new(conn),
        };
        tier.init_schema()?;
        Ok(tier)
    }

    fn init_schema(&self) -> Result<(), DurableTierError> {
        self.conn.lock().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS weather_cache (
                cache_key TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                cached_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_weather_cache_expires ON weather_cache(expires_at);
            "#,
        )?;
        Ok(())
    }

    /// Number of stored rows, expired or not.
    pub fn count(&self) -> Result<usize, DurableTierError> {
        let count: i64 =
            self.conn
                .lock()
                .query_row("SELECT COUNT(*) FROM weather_cache", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl DurableTier for SqliteDurableTier {
    fn read(&self, key: &str, now_ms: i64) -> Result<Option<DurableRecord>, DurableTierError> {
        let row = self
            .conn
            .lock()
            .query_row(
                "SELECT data, cached_at, expires_at FROM weather_cache
                 WHERE cache_key = ?1 AND expires_at > ?2",
                params![key, now_ms],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((data, cached_at, expires_at)) => Ok(Some(DurableRecord {
                value: serde_json::from_str(&data)?,
                cached_at,
                expires_at,
            })),
            None => Ok(None),
        }
    }

    fn upsert(&self, key: &str, record: &DurableRecord) -> Result<(), DurableTierError> {
        let data = serde_json::to_string(&record.value)?;
        self.conn.lock().execute(
            r#"
            INSERT INTO weather_cache (cache_key, data, cached_at, expires_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(cache_key) DO UPDATE SET
                data = excluded.data,
                cached_at = excluded.cached_at,
                expires_at = excluded.expires_at
            "#,
            params![key, data, record.cached_at, record.expires_at],
        )?;
        Ok(())
    }

    fn purge_expired(&self, now_ms: i64) -> Result<usize, DurableTierError> {
        let removed = self.conn.lock().execute(
            "DELETE FROM weather_cache WHERE expires_at <= ?1",
            params![now_ms],
        )?;
        Ok(removed)
    }
}

/// Process-local stand-in for the durable tier, used when persistence is
/// disabled and in tests.
#[derive(Debug, Default)]
pub struct MemoryDurableTier {
    records: Mutex<HashMap<String, DurableRecord>>,
}

impl MemoryDurableTier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Raw access to a record regardless of expiry.
    pub fn peek(&self, key: &str) -> Option<DurableRecord> {
        self.records.lock().get(key).cloned()
    }
}

impl DurableTier for MemoryDurableTier {
    fn read(&self, key: &str, now_ms: i64) -> Result<Option<DurableRecord>, DurableTierError> {
        Ok(self
            .records
            .lock()
            .get(key)
            .filter(|r| r.expires_at > now_ms)
            .cloned())
    }

    fn upsert(&self, key: &str, record: &DurableRecord) -> Result<(), DurableTierError> {
        self.records.lock().insert(key.to_string(), record.clone());
        Ok(())
    }

    fn purge_expired(&self, now_ms: i64) -> Result<usize, DurableTierError> {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, r| r.expires_at > now_ms);
        Ok(before - records.len())
    }
}
