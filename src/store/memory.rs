//! In-process store with per-entry TTL.

use super::{KeyValueStore, StoreEntry, StoreError};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn new(value: String, ttl: Option<Duration>, now: Instant) -> Self {
        Self {
            value,
            // A TTL past the clock's range never expires
            expires_at: ttl.and_then(|ttl| now.checked_add(ttl)),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |expires_at| expires_at > now)
    }
}

/// `KeyValueStore` backed by a `HashMap`. Expired entries read as misses and are dropped
/// lazily or by [`InMemoryStore::purge_expired`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, StoredValue>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries held, expired ones included until purged
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.read_live(key).is_some()
    }

    /// Live value of `key` without going through the async interface
    pub fn peek(&self, key: &str) -> Option<String> {
        self.read_live(key)
    }

    /// Remove every expired entry, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, stored| stored.is_live(now));
        let purged = before - entries.len();
        if purged > 0 {
            debug!(purged = purged, remaining = entries.len(), "Purged expired entries");
        }
        purged
    }

    fn read_live(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.entries
            .read()
            .get(key)
            .filter(|stored| stored.is_live(now))
            .map(|stored| stored.value.clone())
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError> {
        let now = Instant::now();
        let entries = self.entries.read();
        Ok(keys
            .iter()
            .map(|key| {
                entries
                    .get(key)
                    .filter(|stored| stored.is_live(now))
                    .map(|stored| stored.value.clone())
            })
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_live(key))
    }

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let stored = StoredValue::new(value, ttl, Instant::now());
        self.entries.write().insert(key.to_string(), stored);
        Ok(())
    }

    async fn multi_set(&self, entries: Vec<StoreEntry>) -> Result<(), StoreError> {
        let now = Instant::now();
        // Single write guard so readers never observe a partial batch
        let mut map = self.entries.write();
        for entry in entries {
            map.insert(entry.key, StoredValue::new(entry.value, entry.ttl, now));
        }
        Ok(())
    }
}
