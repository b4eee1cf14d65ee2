#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Bastian
//!
//! Read-through cache in front of slow or unreliable origin services, with a circuit
//! breaker guarding every origin call.
//!
//! ## Overview
//!
//! Callers ask for one item ([`ReadThroughCache::get`]) or a batch of items
//! ([`ReadThroughCache::lookup`]). The cache serves what its store holds, asks the origin
//! only for the misses, merges both result sets and writes the fetched items back on a
//! spawned task. A failing store degrades to plain origin calls; a failing origin trips its
//! circuit breaker so it is not hammered by every miss.
//!
//! ## Module Organization
//!
//! - [`cache`] - Read-through paths, request types and origin handler traits
//! - [`resilience`] - Circuit breakers and the per-service registry
//! - [`store`] - Key-value store abstraction and the in-memory store
//! - [`events`] - Typed notifications (`cache-error`, circuit transitions)
//! - [`config`] - Layered configuration loading
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup and helpers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bastian::{CircuitBreakerManager, InMemoryStore, LookupRequest, ReadThroughCache};
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct Cuisine {
//!     id: u32,
//!     name: String,
//! }
//!
//! # async fn example() -> bastian::Result<()> {
//! let cache = ReadThroughCache::new(
//!     Some(Arc::new(InMemoryStore::new())),
//!     CircuitBreakerManager::new(),
//! );
//!
//! let request = LookupRequest::new("cuisine", [1, 2, 3], |ids: Vec<String>| async move {
//!     // Ask the origin service for the missing ids
//!     let cuisines = ids
//!         .iter()
//!         .map(|id| Cuisine { id: id.parse().unwrap_or_default(), name: format!("cuisine {id}") })
//!         .collect::<Vec<_>>();
//!     Ok::<_, anyhow::Error>(cuisines)
//! })
//! .with_expiration_seconds(300);
//!
//! let cuisines: Vec<Cuisine> = cache.lookup(request).await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod resilience;
pub mod store;

pub use cache::{
    BatchOriginHandler, GetRequest, LookupRequest, OriginHandler, ReadThroughCache,
    ReadThroughCacheBuilder,
};
pub use config::{BastianConfig, ConfigManager, ConfigurationError};
pub use error::{BastianError, Result};
pub use events::{CacheEvent, EventPublisher, PublishedEvent};
pub use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerManager,
    CircuitState, CircuitStateListener,
};
pub use store::{InMemoryStore, KeyValueStore, StoreEntry, StoreError};
