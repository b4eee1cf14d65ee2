//! Per-call request descriptions for the batch and single-item paths.

use crate::cache::handler::{BatchOriginHandler, OriginHandler};
use crate::constants::DEFAULT_PRIMARY_FIELD;
use crate::resilience::CircuitBreakerConfig;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

fn ttl_from_seconds(expiration_seconds: u64) -> Option<Duration> {
    (expiration_seconds > 0).then(|| Duration::from_secs(expiration_seconds))
}

/// A batch lookup: resolve every identifier, from the store where possible.
pub struct LookupRequest<T> {
    pub(crate) key_prefix: String,
    pub(crate) ids: Vec<String>,
    pub(crate) primary_field: String,
    pub(crate) expiration_seconds: u64,
    pub(crate) handler: Arc<dyn BatchOriginHandler<T>>,
    pub(crate) service_name: Option<String>,
    pub(crate) breaker_config: Option<CircuitBreakerConfig>,
}

impl<T> LookupRequest<T> {
    /// Identifiers are stringified once here; handlers always receive strings.
    pub fn new<I, S, H>(key_prefix: impl Into<String>, ids: I, handler: H) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
        H: BatchOriginHandler<T> + 'static,
    {
        Self::with_shared_handler(key_prefix, ids, Arc::new(handler))
    }

    pub fn with_shared_handler<I, S>(
        key_prefix: impl Into<String>,
        ids: I,
        handler: Arc<dyn BatchOriginHandler<T>>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self {
            key_prefix: key_prefix.into(),
            ids: ids.into_iter().map(|id| id.to_string()).collect(),
            primary_field: DEFAULT_PRIMARY_FIELD.to_string(),
            expiration_seconds: 0,
            handler,
            service_name: None,
            breaker_config: None,
        }
    }

    /// Field of each fetched item that names its cache key
    pub fn with_primary_field(mut self, primary_field: impl Into<String>) -> Self {
        self.primary_field = primary_field.into();
        self
    }

    /// Expiry of written entries; 0 keeps them until overwritten
    pub fn with_expiration_seconds(mut self, expiration_seconds: u64) -> Self {
        self.expiration_seconds = expiration_seconds;
        self
    }

    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = Some(service_name.into());
        self
    }

    /// Breaker settings used if this call creates the service's breaker
    pub fn with_breaker_config(mut self, config: CircuitBreakerConfig) -> Self {
        self.breaker_config = Some(config);
        self
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn primary_field(&self) -> &str {
        &self.primary_field
    }

    /// The breaker name, falling back to the key prefix
    pub fn service_name(&self) -> &str {
        self.service_name.as_deref().unwrap_or(&self.key_prefix)
    }

    pub fn ttl(&self) -> Option<Duration> {
        ttl_from_seconds(self.expiration_seconds)
    }
}

impl<T> fmt::Debug for LookupRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupRequest")
            .field("key_prefix", &self.key_prefix)
            .field("ids", &self.ids)
            .field("primary_field", &self.primary_field)
            .field("expiration_seconds", &self.expiration_seconds)
            .field("service_name", &self.service_name())
            .field("breaker_config", &self.breaker_config)
            .finish()
    }
}

/// A single-item read.
pub struct GetRequest<T> {
    pub(crate) key_prefix: String,
    pub(crate) id: Option<String>,
    pub(crate) expiration_seconds: u64,
    pub(crate) handler: Arc<dyn OriginHandler<T>>,
    pub(crate) service_name: Option<String>,
    pub(crate) breaker_config: Option<CircuitBreakerConfig>,
}

impl<T> GetRequest<T> {
    /// Keyless request: the entry lives under the bare prefix
    pub fn new<H>(key_prefix: impl Into<String>, handler: H) -> Self
    where
        H: OriginHandler<T> + 'static,
    {
        Self::with_shared_handler(key_prefix, Arc::new(handler))
    }

    pub fn with_shared_handler(
        key_prefix: impl Into<String>,
        handler: Arc<dyn OriginHandler<T>>,
    ) -> Self {
        Self {
            key_prefix: key_prefix.into(),
            id: None,
            expiration_seconds: 0,
            handler,
            service_name: None,
            breaker_config: None,
        }
    }

    /// An empty identifier is the same as none
    pub fn with_id(mut self, id: impl ToString) -> Self {
        let id = id.to_string();
        self.id = (!id.is_empty()).then_some(id);
        self
    }

    pub fn with_expiration_seconds(mut self, expiration_seconds: u64) -> Self {
        self.expiration_seconds = expiration_seconds;
        self
    }

    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = Some(service_name.into());
        self
    }

    pub fn with_breaker_config(mut self, config: CircuitBreakerConfig) -> Self {
        self.breaker_config = Some(config);
        self
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn service_name(&self) -> &str {
        self.service_name.as_deref().unwrap_or(&self.key_prefix)
    }

    pub fn ttl(&self) -> Option<Duration> {
        ttl_from_seconds(self.expiration_seconds)
    }
}

impl<T> fmt::Debug for GetRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetRequest")
            .field("key_prefix", &self.key_prefix)
            .field("id", &self.id)
            .field("expiration_seconds", &self.expiration_seconds)
            .field("service_name", &self.service_name())
            .field("breaker_config", &self.breaker_config)
            .finish()
    }
}
