//! Error types for the Bastian read-through cache.
//!
//! Store-tier failures are absorbed inside the cache and only ever reach callers through
//! published events; origin-tier failures (handler errors, timeouts, open circuits) are
//! returned as-is.

use crate::resilience::CircuitBreakerError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BastianError {
    #[error("Origin handler error: {0}")]
    Handler(anyhow::Error),
    #[error("Origin handler for {service_name} timed out after {}ms", .timeout.as_millis())]
    Timeout {
        service_name: String,
        timeout: Duration,
    },
    #[error("Circuit breaker open: {service_name}")]
    CircuitOpen { service_name: String },
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl BastianError {
    /// True when the breaker short-circuited the call without running the handler
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, BastianError::CircuitOpen { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, BastianError::Timeout { .. })
    }

    /// The error reported by the origin handler, if that is what failed
    pub fn handler_error(&self) -> Option<&anyhow::Error> {
        match self {
            BastianError::Handler(error) => Some(error),
            _ => None,
        }
    }
}

impl From<CircuitBreakerError<anyhow::Error>> for BastianError {
    fn from(error: CircuitBreakerError<anyhow::Error>) -> Self {
        match error {
            CircuitBreakerError::CircuitOpen { component } => BastianError::CircuitOpen {
                service_name: component,
            },
            CircuitBreakerError::Timeout { component, timeout } => BastianError::Timeout {
                service_name: component,
                timeout,
            },
            CircuitBreakerError::OperationFailed(error) => BastianError::Handler(error),
        }
    }
}

impl From<crate::config::ConfigurationError> for BastianError {
    fn from(error: crate::config::ConfigurationError) -> Self {
        BastianError::Configuration(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BastianError>;
