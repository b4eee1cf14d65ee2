//! # Circuit Breaker Configuration
//!
//! Configuration for a single circuit breaker instance.
//!
//! **Note**: File-based configuration lives in `crate::config::CircuitBreakersConfig`, which
//! stores millisecond integers per service and converts into this type.

use crate::constants::breaker;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a single circuit breaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// When false the breaker is a pass-through: no tracking, no timeout
    pub enabled: bool,

    /// Maximum time an origin call may take before it counts as a failure
    pub timeout: Duration,

    /// Failure percentage over the rolling window at which the circuit opens
    pub error_threshold_percentage: u8,

    /// Time to wait in open state before admitting a trial call
    pub reset_timeout: Duration,

    /// Length of the rolling statistics window
    pub rolling_window: Duration,

    /// Number of buckets the rolling window is divided into
    pub rolling_buckets: u32,

    /// Minimum number of calls in the window before the circuit may open
    pub volume_threshold: u64,
}

impl CircuitBreakerConfig {
    /// Enabled breaker with the remaining settings at their defaults
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_error_threshold_percentage(mut self, percentage: u8) -> Self {
        self.error_threshold_percentage = percentage;
        self
    }

    pub fn with_reset_timeout(mut self, reset_timeout: Duration) -> Self {
        self.reset_timeout = reset_timeout;
        self
    }

    pub fn with_rolling_window(mut self, window: Duration, buckets: u32) -> Self {
        self.rolling_window = window;
        self.rolling_buckets = buckets;
        self
    }

    pub fn with_volume_threshold(mut self, volume_threshold: u64) -> Self {
        self.volume_threshold = volume_threshold;
        self
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.error_threshold_percentage > 100 {
            return Err("error_threshold_percentage must be between 0 and 100".to_string());
        }

        if self.rolling_buckets == 0 {
            return Err("rolling_buckets must be greater than 0".to_string());
        }

        if self.rolling_window.is_zero() {
            return Err("rolling_window must be greater than 0".to_string());
        }

        if self.enabled && self.timeout.is_zero() {
            return Err("timeout must be greater than 0 when the breaker is enabled".to_string());
        }

        if self.enabled && self.reset_timeout.is_zero() {
            return Err(
                "reset_timeout must be greater than 0 when the breaker is enabled".to_string(),
            );
        }

        Ok(())
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: breaker::DEFAULT_ENABLED,
            timeout: Duration::from_millis(breaker::DEFAULT_TIMEOUT_MS),
            error_threshold_percentage: breaker::DEFAULT_ERROR_THRESHOLD_PERCENTAGE,
            reset_timeout: Duration::from_millis(breaker::DEFAULT_RESET_TIMEOUT_MS),
            rolling_window: Duration::from_millis(breaker::DEFAULT_ROLLING_WINDOW_MS),
            rolling_buckets: breaker::DEFAULT_ROLLING_BUCKETS,
            volume_threshold: breaker::DEFAULT_VOLUME_THRESHOLD,
        }
    }
}
