//! Two-tier read-through cache.
//!
//! Lookups check the process-local tier first, then the durable tier, and
//! only then call the supplied fetch function. A successful fetch is written
//! to both tiers. Durable-tier failures are logged and never surface to the
//! caller.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::clock::Clock;
use crate::durable::{DurableRecord, DurableTier};
use crate::error::DurableTierError;

/// Freshness window for cached weather data.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Identifies one cacheable query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for a city's current conditions: `current_<city>`.
    pub fn current(city: &str) -> Self {
        Self(format!("current_{}", city))
    }

    /// Key for a city's 3-hour forecast series: `forecast_<city>`.
    pub fn forecast(city: &str) -> Self {
        Self(format!("forecast_{}", city))
    }

    /// Arbitrary key. Returns `None` for an empty string.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    stored_at: i64,
}

/// Local + durable cache in front of an upstream fetch.
pub struct TieredCache {
    local: Mutex<HashMap<String, CacheEntry>>,
    durable: Arc<dyn DurableTier>,
    clock: Arc<dyn Clock>,
}

impl TieredCache {
    pub fn new(durable: Arc<dyn DurableTier>, clock: Arc<dyn Clock>) -> Self {
        Self {
            local: Mutex::new(HashMap::new()),
            durable,
            clock,
        }
    }

    /// Return the cached value for `key` if it is younger than `ttl`,
    /// otherwise call `fetch` and cache its result.
    ///
    /// A durable record is only used when it is both unexpired by its own
    /// `expires_at` and younger than `ttl` by its `cached_at`; the durable
    /// tier may keep entries longer than the freshness window.
    ///
    /// Errors from `fetch` are returned unchanged and nothing is cached.
    /// Concurrent misses on the same key each call their own `fetch`.
    pub async fn get<T, E, F, Fut>(&self, key: &CacheKey, fetch: F, ttl: Duration) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let now = self.clock.now_ms();

        if let Some(value) = self.read_local(key, now, ttl_ms) {
            tracing::debug!(key = %key, "local cache hit");
            return Ok(value);
        }

        if let Some(record) = self.read_durable(key, now).await {
            let age = now.saturating_sub(record.cached_at);
            if age < ttl_ms {
                match serde_json::from_value::<T>(record.value.clone()) {
                    Ok(value) => {
                        tracing::debug!(key = %key, age_ms = age, "durable cache hit");
                        self.backfill(key, record);
                        return Ok(value);
                    }
                    Err(e) => {
                        tracing::warn!(key = %key, "Discarding undecodable durable entry: {}", e);
                    }
                }
            } else {
                tracing::debug!(key = %key, age_ms = age, "durable entry older than ttl");
            }
        }

        tracing::debug!(key = %key, "cache miss, fetching");
        let value = fetch().await?;
        self.store(key, &value, ttl_ms).await;
        Ok(value)
    }

    /// Drop `key` from the local tier. The durable tier is left alone.
    pub fn invalidate(&self, key: &CacheKey) {
        self.local.lock().remove(key.as_str());
    }

    /// Number of entries in the local tier, fresh or not.
    pub fn local_len(&self) -> usize {
        self.local.lock().len()
    }

    /// Remove expired records from the durable tier.
    pub async fn purge_expired(&self) -> Result<usize, DurableTierError> {
        let durable = Arc::clone(&self.durable);
        let now = self.clock.now_ms();
        tokio::task::spawn_blocking(move || durable.purge_expired(now))
            .await
            .map_err(|e| DurableTierError::Task(e.to_string()))?
    }

    fn read_local<T: DeserializeOwned>(&self, key: &CacheKey, now: i64, ttl_ms: i64) -> Option<T> {
        let entry = {
            let local = self.local.lock();
            let entry = local.get(key.as_str())?;
            if now.saturating_sub(entry.stored_at) >= ttl_ms {
                return None;
            }
            entry.value.clone()
        };

        match serde_json::from_value(entry) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, "Discarding undecodable local entry: {}", e);
                self.local.lock().remove(key.as_str());
                None
            }
        }
    }

    /// Copy a durable hit into the local tier unless a newer entry landed
    /// there while the durable read was in flight.
    fn backfill(&self, key: &CacheKey, record: DurableRecord) {
        let mut local = self.local.lock();
        if local
            .get(key.as_str())
            .is_some_and(|entry| entry.stored_at > record.cached_at)
        {
            return;
        }
        local.insert(
            key.as_str().to_string(),
            CacheEntry {
                value: record.value,
                stored_at: record.cached_at,
            },
        );
    }

    async fn read_durable(&self, key: &CacheKey, now: i64) -> Option<DurableRecord> {
        let durable = Arc::clone(&self.durable);
        let owned_key = key.as_str().to_string();
        let result = tokio::task::spawn_blocking(move || durable.read(&owned_key, now))
            .await
            .map_err(|e| DurableTierError::Task(e.to_string()))
            .and_then(|r| r);

        match result {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(key = %key, "Durable cache read failed: {}", e);
                None
            }
        }
    }

    async fn store<T: Serialize>(&self, key: &CacheKey, value: &T, ttl_ms: i64) {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(key = %key, "Value not cacheable: {}", e);
                return;
            }
        };
        let now = self.clock.now_ms();

        self.local.lock().insert(
            key.as_str().to_string(),
            CacheEntry {
                value: value.clone(),
                stored_at: now,
            },
        );

        let record = DurableRecord {
            value,
            cached_at: now,
            expires_at: now.saturating_add(ttl_ms),
        };
        let durable = Arc::clone(&self.durable);
        let owned_key = key.as_str().to_string();
        let result = tokio::task::spawn_blocking(move || durable.upsert(&owned_key, &record))
            .await
            .map_err(|e| DurableTierError::Task(e.to_string()))
            .and_then(|r| r);

        if let Err(e) = result {
            tracing::warn!(key = %key, "Durable cache write failed: {}", e);
        }
    }
}
