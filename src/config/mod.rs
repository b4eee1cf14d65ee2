//! # Bastian Configuration System
//!
//! File and environment based configuration for the breaker registry and the event
//! channel. Every field has a default, so an empty configuration is valid.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bastian::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration (environment auto-detected)
//! let manager = ConfigManager::load()?;
//!
//! let capacity = manager.config().events.channel_capacity;
//! let cuisine = manager
//!     .config()
//!     .circuit_breakers
//!     .config_for_component("cuisine")
//!     .to_resilience_config();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::constants::{breaker, events};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BastianConfig {
    pub circuit_breakers: CircuitBreakersConfig,
    pub events: EventsConfig,
}

/// Circuit breaker settings for every origin service
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakersConfig {
    /// Global circuit breaker settings
    pub global_settings: CircuitBreakerGlobalSettings,

    /// Configuration for services without a dedicated entry
    pub default_config: CircuitBreakerComponentConfig,

    /// Configurations keyed by service name
    pub component_configs: HashMap<String, CircuitBreakerComponentConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerGlobalSettings {
    /// Registry size above which a warning is logged
    pub max_circuit_breakers: usize,
}

impl Default for CircuitBreakerGlobalSettings {
    fn default() -> Self {
        Self {
            max_circuit_breakers: breaker::DEFAULT_MAX_CIRCUIT_BREAKERS,
        }
    }
}

/// Circuit breaker configuration for one service, durations in milliseconds
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerComponentConfig {
    pub enabled: bool,
    pub timeout_ms: u64,
    pub error_threshold_percentage: u8,
    pub reset_timeout_ms: u64,
    pub rolling_window_ms: u64,
    pub rolling_buckets: u32,
    pub volume_threshold: u64,
}

impl Default for CircuitBreakerComponentConfig {
    fn default() -> Self {
        Self {
            enabled: breaker::DEFAULT_ENABLED,
            timeout_ms: breaker::DEFAULT_TIMEOUT_MS,
            error_threshold_percentage: breaker::DEFAULT_ERROR_THRESHOLD_PERCENTAGE,
            reset_timeout_ms: breaker::DEFAULT_RESET_TIMEOUT_MS,
            rolling_window_ms: breaker::DEFAULT_ROLLING_WINDOW_MS,
            rolling_buckets: breaker::DEFAULT_ROLLING_BUCKETS,
            volume_threshold: breaker::DEFAULT_VOLUME_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Buffered events per subscriber before slow subscribers start lagging
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: events::DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl CircuitBreakersConfig {
    /// Get configuration for a specific service
    pub fn config_for_component(&self, component_name: &str) -> CircuitBreakerComponentConfig {
        self.component_configs
            .get(component_name)
            .cloned()
            .unwrap_or_else(|| self.default_config.clone())
    }
}

impl CircuitBreakerComponentConfig {
    /// Convert to resilience module's format
    pub fn to_resilience_config(&self) -> crate::resilience::CircuitBreakerConfig {
        crate::resilience::CircuitBreakerConfig {
            enabled: self.enabled,
            timeout: Duration::from_millis(self.timeout_ms),
            error_threshold_percentage: self.error_threshold_percentage,
            reset_timeout: Duration::from_millis(self.reset_timeout_ms),
            rolling_window: Duration::from_millis(self.rolling_window_ms),
            rolling_buckets: self.rolling_buckets,
            volume_threshold: self.volume_threshold,
        }
    }
}

impl BastianConfig {
    /// Validate configuration consistency
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.events.channel_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "events.channel_capacity",
                "0",
                "channel capacity must be greater than 0",
            ));
        }

        if self.circuit_breakers.global_settings.max_circuit_breakers == 0 {
            return Err(ConfigurationError::invalid_value(
                "circuit_breakers.global_settings.max_circuit_breakers",
                "0",
                "maximum must be greater than 0",
            ));
        }

        let breakers = &self.circuit_breakers;
        let components = std::iter::once(("default_config".to_string(), &breakers.default_config))
            .chain(
                breakers
                    .component_configs
                    .iter()
                    .map(|(name, config)| (format!("component_configs.{name}"), config)),
            );

        for (path, component) in components {
            component.to_resilience_config().validate().map_err(|reason| {
                ConfigurationError::validation_error(format!("circuit_breakers.{path}: {reason}"))
            })?;
        }

        Ok(())
    }
}
