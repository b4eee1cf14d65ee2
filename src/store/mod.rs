//! # Key-Value Store
//!
//! The cache tier the read-through layer talks to. Values are JSON text; expiry is the
//! store's business. Implementations must be safe to share between tasks.

pub mod memory;

use async_trait::async_trait;
use std::time::Duration;

pub use memory::InMemoryStore;

/// Errors raised by a store. The cache never propagates these to its callers.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store operation {operation} failed: {message}")]
    Operation { operation: String, message: String },

    #[error("Store operation timed out")]
    Timeout,
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn operation(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Operation {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// One write of a multi-set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    pub key: String,
    pub value: String,
    /// `None` keeps the entry until it is overwritten
    pub ttl: Option<Duration>,
}

impl StoreEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>, ttl: Option<Duration>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ttl,
        }
    }
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// A name for logging, e.g. "memory" or "redis"
    fn name(&self) -> &'static str;

    /// Fetch many keys at once. The result has exactly one slot per key, in key order,
    /// `None` for misses.
    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>)
        -> Result<(), StoreError>;

    /// Write every entry as one atomic unit: either all entries land or none do.
    async fn multi_set(&self, entries: Vec<StoreEntry>) -> Result<(), StoreError>;
}
