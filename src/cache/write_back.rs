//! Asynchronous write-back of freshly fetched items.
//!
//! Entries are serialized on the caller's task, then handed to a spawned task that
//! performs the store write. The caller never waits for the write and never sees its
//! failures; those are logged and published as `cache-error`.

use crate::cache::keys;
use crate::events::{CacheEvent, EventPublisher};
use crate::logging::log_error;
use crate::store::{KeyValueStore, StoreEntry};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn, Instrument};

/// Key value of an item's primary field, when it is a scalar
pub(crate) fn primary_key_value(item: &Value, primary_field: &str) -> Option<String> {
    match item.get(primary_field)? {
        Value::String(value) => Some(value.clone()),
        Value::Number(value) => Some(value.to_string()),
        Value::Bool(value) => Some(value.to_string()),
        _ => None,
    }
}

/// Store entries for a fetched batch. Items that fail to serialize or lack a scalar
/// primary field are left out and reported in the second element.
pub(crate) fn batch_entries<T: Serialize>(
    items: &[T],
    key_prefix: &str,
    primary_field: &str,
    ttl: Option<Duration>,
) -> (Vec<StoreEntry>, Vec<String>) {
    let mut entries = Vec::with_capacity(items.len());
    let mut skipped = Vec::new();

    for (position, item) in items.iter().enumerate() {
        let value = match serde_json::to_value(item) {
            Ok(value) => value,
            Err(error) => {
                skipped.push(format!("item {position}: {error}"));
                continue;
            }
        };
        let Some(id) = primary_key_value(&value, primary_field) else {
            skipped.push(format!("item {position}: no scalar '{primary_field}' field"));
            continue;
        };
        entries.push(StoreEntry::new(
            keys::batch_key(key_prefix, &id),
            value.to_string(),
            ttl,
        ));
    }

    (entries, skipped)
}

/// Store entry for a single item; `None` for items that serialize to JSON `null`
pub(crate) fn single_entry<T: Serialize>(
    item: &T,
    key: String,
    ttl: Option<Duration>,
) -> Result<Option<StoreEntry>, serde_json::Error> {
    let value = serde_json::to_value(item)?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(Some(StoreEntry::new(key, value.to_string(), ttl)))
}

/// Spawns store writes and reports their failures
#[derive(Clone)]
pub(crate) struct WriteBack {
    store: Arc<dyn KeyValueStore>,
    events: EventPublisher,
}

impl WriteBack {
    pub fn new(store: Arc<dyn KeyValueStore>, events: EventPublisher) -> Self {
        Self { store, events }
    }

    /// Write a batch atomically. An empty batch is skipped.
    pub fn spawn_multi_set(
        &self,
        context: &str,
        entries: Vec<StoreEntry>,
    ) -> Option<JoinHandle<()>> {
        if entries.is_empty() {
            return None;
        }

        let this = self.clone();
        let context = context.to_string();
        Some(tokio::spawn(
            async move {
                let count = entries.len();
                match this.store.multi_set(entries).await {
                    Ok(()) => debug!(entries = count, "Write-back complete"),
                    Err(error) => this.report(&context, "multi_set", &error.to_string()),
                }
            }
            .in_current_span(),
        ))
    }

    pub fn spawn_set(&self, context: &str, entry: StoreEntry) -> JoinHandle<()> {
        let this = self.clone();
        let context = context.to_string();
        tokio::spawn(
            async move {
                match this.store.set(&entry.key, entry.value, entry.ttl).await {
                    Ok(()) => debug!(key = %entry.key, "Write-back complete"),
                    Err(error) => this.report(&context, "set", &error.to_string()),
                }
            }
            .in_current_span(),
        )
    }

    pub fn report(&self, context: &str, operation: &str, error: &str) {
        log_error("write_back", operation, error, Some(context));
        self.events.publish(CacheEvent::cache_error(context, operation, error));
    }

    pub fn warn_skipped(&self, context: &str, skipped: &[String]) {
        for reason in skipped {
            warn!(key_prefix = %context, reason = %reason, "Item not written back");
        }
    }
}
