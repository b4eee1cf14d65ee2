//! # Read-Through Cache
//!
//! Serves what the store holds, asks the origin only for what it lacks, returns the merged
//! result and writes fresh items back without making the caller wait.
//!
//! ```text
//! lookup(ids) → multi_get(keys) → partition → [all hits] → return
//!                                          → breaker.call(handler(misses)) → merge → return
//!                                                                          ↘ spawn multi_set
//! ```
//!
//! Store failures never reach the caller: they are published as `cache-error` and the
//! request degrades to a plain (breaker-protected) origin call. Origin failures always
//! reach the caller unchanged.

use crate::cache::handler::{BatchOriginHandler, OriginHandler};
use crate::cache::keys;
use crate::cache::merge::{self, Partition};
use crate::cache::request::{GetRequest, LookupRequest};
use crate::cache::write_back::{self, WriteBack};
use crate::config::BastianConfig;
use crate::error::{BastianError, Result};
use crate::events::{CacheEvent, EventPublisher, PublishedEvent};
use crate::logging::{log_cache_operation, log_error};
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerManager};
use crate::store::{KeyValueStore, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Read-through cache over an optional key-value store.
///
/// Cheap to clone; clones share the store, the breaker registry and the event channel.
#[derive(Clone)]
pub struct ReadThroughCache {
    store: Option<Arc<dyn KeyValueStore>>,
    breakers: CircuitBreakerManager,
    events: EventPublisher,
}

/// Builder for [`ReadThroughCache`]
#[derive(Default)]
pub struct ReadThroughCacheBuilder {
    store: Option<Arc<dyn KeyValueStore>>,
    breakers: Option<CircuitBreakerManager>,
    events: Option<EventPublisher>,
}

impl ReadThroughCacheBuilder {
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Share a breaker registry with other caches
    pub fn circuit_breakers(mut self, breakers: CircuitBreakerManager) -> Self {
        self.breakers = Some(breakers);
        self
    }

    /// Share an event channel with other caches
    pub fn events(mut self, events: EventPublisher) -> Self {
        self.events = Some(events);
        self
    }

    pub fn build(self) -> ReadThroughCache {
        let breakers = self.breakers.unwrap_or_default();
        let events = self.events.unwrap_or_default();
        breakers.add_listener(events.circuit_listener());

        debug!(
            store = self.store.as_ref().map(|store| store.name()),
            "Read-through cache created"
        );

        ReadThroughCache {
            store: self.store,
            breakers,
            events,
        }
    }
}

impl ReadThroughCache {
    pub fn builder() -> ReadThroughCacheBuilder {
        ReadThroughCacheBuilder::default()
    }

    /// Cache over `store` with its own event channel. `None` disables caching: every
    /// request goes straight to the origin.
    pub fn new(store: Option<Arc<dyn KeyValueStore>>, breakers: CircuitBreakerManager) -> Self {
        let builder = Self::builder().circuit_breakers(breakers);
        match store {
            Some(store) => builder.store(store).build(),
            None => builder.build(),
        }
    }

    /// Cache wired from loaded configuration: breaker settings per service and the event
    /// channel capacity
    pub fn from_config(store: Option<Arc<dyn KeyValueStore>>, config: &BastianConfig) -> Self {
        let builder = Self::builder()
            .circuit_breakers(CircuitBreakerManager::from_config(&config.circuit_breakers))
            .events(EventPublisher::new(config.events.channel_capacity));
        match store {
            Some(store) => builder.store(store).build(),
            None => builder.build(),
        }
    }

    /// Publisher carrying this cache's notifications
    pub fn events(&self) -> &EventPublisher {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.events.subscribe()
    }

    pub fn circuit_breakers(&self) -> &CircuitBreakerManager {
        &self.breakers
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// Resolve every identifier of the request.
    ///
    /// Returns cached items (in request order) followed by the items the origin returned
    /// for the misses. Fails only when the origin call fails.
    #[instrument(
        name = "lookup",
        skip_all,
        fields(
            call_id = %Uuid::new_v4(),
            key_prefix = %request.key_prefix,
            service = %request.service_name(),
            requested = request.ids.len()
        )
    )]
    pub async fn lookup<T>(&self, request: LookupRequest<T>) -> Result<Vec<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        if request.ids.is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let breaker = self.breaker_for(request.service_name(), request.breaker_config.as_ref());

        let Some(store) = &self.store else {
            return Self::fetch_many(&breaker, &request.handler, request.ids.clone()).await;
        };

        let cache_keys = keys::batch_keys(&request.key_prefix, &request.ids);
        let values = match store.multi_get(&cache_keys).await {
            Ok(values) if values.len() == cache_keys.len() => values,
            Ok(values) => {
                let error = StoreError::operation(
                    "multi_get",
                    format!("expected {} values, got {}", cache_keys.len(), values.len()),
                );
                self.report_store_error(&request.key_prefix, "multi_get", &error);
                return Self::fetch_many(&breaker, &request.handler, request.ids.clone()).await;
            }
            Err(error) => {
                self.report_store_error(&request.key_prefix, "multi_get", &error);
                return Self::fetch_many(&breaker, &request.handler, request.ids.clone()).await;
            }
        };

        let Partition {
            hits,
            remaining_ids,
            corrupt,
        } = merge::partition::<T>(&request.ids, &cache_keys, values);

        for (key, error) in &corrupt {
            self.report_store_error(&request.key_prefix, "decode", &format!("{key}: {error}"));
        }

        if remaining_ids.is_empty() {
            log_cache_operation(
                "lookup",
                &request.key_prefix,
                request.service_name(),
                request.ids.len(),
                hits.len(),
                "hit",
                Some(started.elapsed().as_millis() as u64),
            );
            return Ok(hits);
        }

        debug!(
            hits = hits.len(),
            misses = remaining_ids.len(),
            "Fetching misses from origin"
        );

        let fetched = Self::fetch_many(&breaker, &request.handler, remaining_ids).await?;

        let (entries, skipped) = write_back::batch_entries(
            &fetched,
            &request.key_prefix,
            &request.primary_field,
            request.ttl(),
        );
        let writer = WriteBack::new(Arc::clone(store), self.events.clone());
        writer.warn_skipped(&request.key_prefix, &skipped);
        writer.spawn_multi_set(&request.key_prefix, entries);

        log_cache_operation(
            "lookup",
            &request.key_prefix,
            request.service_name(),
            request.ids.len(),
            hits.len(),
            "partial",
            Some(started.elapsed().as_millis() as u64),
        );

        Ok(merge::merge(hits, fetched))
    }

    /// Resolve a single item, from the store when present.
    #[instrument(
        name = "get",
        skip_all,
        fields(
            call_id = %Uuid::new_v4(),
            key_prefix = %request.key_prefix,
            service = %request.service_name(),
            id = request.id.as_deref()
        )
    )]
    pub async fn get<T>(&self, request: GetRequest<T>) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        let started = Instant::now();
        let breaker = self.breaker_for(request.service_name(), request.breaker_config.as_ref());

        let Some(store) = &self.store else {
            return Self::fetch_one(&breaker, &request.handler, request.id.clone()).await;
        };

        let key = keys::single_key(&request.key_prefix, request.id.as_deref());
        match store.get(&key).await {
            Err(error) => {
                self.report_store_error(&request.key_prefix, "get", &error);
                return Self::fetch_one(&breaker, &request.handler, request.id.clone()).await;
            }
            Ok(Some(raw)) if !raw.is_empty() => match serde_json::from_str::<T>(&raw) {
                Ok(item) => {
                    log_cache_operation(
                        "get",
                        &request.key_prefix,
                        request.service_name(),
                        1,
                        1,
                        "hit",
                        Some(started.elapsed().as_millis() as u64),
                    );
                    return Ok(item);
                }
                Err(error) => {
                    let error = format!("{key}: {error}");
                    self.report_store_error(&request.key_prefix, "decode", &error);
                }
            },
            Ok(_) => {}
        }

        let item = Self::fetch_one(&breaker, &request.handler, request.id.clone()).await?;

        let writer = WriteBack::new(Arc::clone(store), self.events.clone());
        match write_back::single_entry(&item, key, request.ttl()) {
            Ok(Some(entry)) => {
                writer.spawn_set(&request.key_prefix, entry);
            }
            Ok(None) => debug!("Null item not written back"),
            Err(error) => writer.report(&request.key_prefix, "encode", &error.to_string()),
        }

        log_cache_operation(
            "get",
            &request.key_prefix,
            request.service_name(),
            1,
            0,
            "miss",
            Some(started.elapsed().as_millis() as u64),
        );

        Ok(item)
    }

    fn breaker_for(
        &self,
        service_name: &str,
        config: Option<&CircuitBreakerConfig>,
    ) -> Arc<CircuitBreaker> {
        match config {
            Some(config) => self.breakers.get_or_create(service_name, config),
            None => self.breakers.get_circuit_breaker(service_name),
        }
    }

    async fn fetch_many<T>(
        breaker: &CircuitBreaker,
        handler: &Arc<dyn BatchOriginHandler<T>>,
        ids: Vec<String>,
    ) -> Result<Vec<T>> {
        breaker
            .call(|| handler.fetch_many(ids))
            .await
            .map_err(BastianError::from)
    }

    async fn fetch_one<T>(
        breaker: &CircuitBreaker,
        handler: &Arc<dyn OriginHandler<T>>,
        id: Option<String>,
    ) -> Result<T> {
        breaker
            .call(|| handler.fetch_one(id))
            .await
            .map_err(BastianError::from)
    }

    fn report_store_error(&self, context: &str, operation: &str, error: &dyn fmt::Display) {
        let error = error.to_string();
        log_error("read_through", operation, &error, Some(context));
        self.events.publish(CacheEvent::cache_error(context, operation, error));
    }
}

impl fmt::Debug for ReadThroughCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadThroughCache")
            .field("store", &self.store.as_ref().map(|store| store.name()))
            .field("breakers", &self.breakers)
            .field("subscribers", &self.events.subscriber_count())
            .finish()
    }
}
