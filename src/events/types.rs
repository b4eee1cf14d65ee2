//! Typed notifications emitted by the cache layer.

use crate::constants::events;
use crate::resilience::CircuitState;
use serde::{Deserialize, Serialize};

/// Everything a cache instance reports to its subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum CacheEvent {
    /// A store operation failed and was absorbed
    CacheError {
        /// Key prefix of the request that hit the failure
        context: String,
        /// Store operation that failed (`multi_get`, `get`, `set`, `multi_set`, `decode`)
        operation: String,
        error: String,
    },
    CircuitOpen {
        service_name: String,
    },
    CircuitHalfOpen {
        service_name: String,
    },
    CircuitClose {
        service_name: String,
    },
}

impl CacheEvent {
    pub fn cache_error(
        context: impl Into<String>,
        operation: impl Into<String>,
        error: impl ToString,
    ) -> Self {
        Self::CacheError {
            context: context.into(),
            operation: operation.into(),
            error: error.to_string(),
        }
    }

    /// Map a breaker transition to its notification
    pub fn from_circuit_state(service_name: &str, state: CircuitState) -> Self {
        let service_name = service_name.to_string();
        match state {
            CircuitState::Open => Self::CircuitOpen { service_name },
            CircuitState::HalfOpen => Self::CircuitHalfOpen { service_name },
            CircuitState::Closed => Self::CircuitClose { service_name },
        }
    }

    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            Self::CacheError { .. } => events::CACHE_ERROR,
            Self::CircuitOpen { .. } => events::CIRCUIT_OPEN,
            Self::CircuitHalfOpen { .. } => events::CIRCUIT_HALF_OPEN,
            Self::CircuitClose { .. } => events::CIRCUIT_CLOSE,
        }
    }

    pub fn is_circuit_event(&self) -> bool {
        !matches!(self, Self::CacheError { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(
            CacheEvent::cache_error("cuisine", "multi_get", "boom").name(),
            "cache-error"
        );
        assert_eq!(
            CacheEvent::from_circuit_state("cuisine", CircuitState::Open).name(),
            "circuit-open"
        );
        assert_eq!(
            CacheEvent::from_circuit_state("cuisine", CircuitState::HalfOpen).name(),
            "circuit-half-open"
        );
        assert_eq!(
            CacheEvent::from_circuit_state("cuisine", CircuitState::Closed).name(),
            "circuit-close"
        );
    }

    #[test]
    fn test_serializes_with_event_tag() {
        let event = CacheEvent::from_circuit_state("cuisine", CircuitState::Open);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "circuit-open");
        assert_eq!(json["service_name"], "cuisine");
    }
}
