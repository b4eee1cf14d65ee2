//! # Resilience Module
//!
//! Circuit breakers guarding origin calls. Each origin service gets one breaker, shared by
//! every cache instance that names the same service.
//!
//! ## Architecture
//!
//! - **Circuit Breakers**: Fail fast while an origin is unhealthy, enforce a call timeout
//! - **Rolling Window**: Error percentage is measured over recent calls only
//! - **Manager**: Process-wide registry with insert-if-absent semantics
//! - **Listeners**: State transitions are pushed to subscribers (the cache event publisher)
//!
//! ## Usage
//!
//! ```rust
//! use bastian::resilience::{CircuitBreakerConfig, CircuitBreakerManager, CircuitState};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let manager = CircuitBreakerManager::new();
//! let config = CircuitBreakerConfig::enabled().with_timeout(Duration::from_millis(250));
//! let breaker = manager.get_or_create("cuisine", &config);
//!
//! let result = breaker
//!     .call(|| async { Ok::<&str, std::io::Error>("italian") })
//!     .await;
//!
//! assert_eq!(result.unwrap(), "italian");
//! assert_eq!(breaker.state(), CircuitState::Closed);
//! # });
//! ```

pub mod circuit_breaker;
pub mod config;
pub mod manager;
pub mod metrics;
mod rolling_window;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerError, CircuitState, CircuitStateListener};
pub use config::CircuitBreakerConfig;
pub use manager::CircuitBreakerManager;
pub use metrics::{CircuitBreakerMetrics, SystemCircuitBreakerMetrics};
