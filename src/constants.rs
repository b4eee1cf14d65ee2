//! # Constants
//!
//! Defaults shared by the breaker, the cache and the configuration layer.

/// Separator between a key prefix and an identifier
pub const KEY_SEPARATOR: &str = ":";

/// Field read from fetched items to build write-back keys when none is given
pub const DEFAULT_PRIMARY_FIELD: &str = "id";

/// Circuit breaker defaults
pub mod breaker {
    pub const DEFAULT_ENABLED: bool = false;
    pub const DEFAULT_TIMEOUT_MS: u64 = 250;
    pub const DEFAULT_ERROR_THRESHOLD_PERCENTAGE: u8 = 5;
    pub const DEFAULT_RESET_TIMEOUT_MS: u64 = 300;
    pub const DEFAULT_ROLLING_WINDOW_MS: u64 = 10_000;
    pub const DEFAULT_ROLLING_BUCKETS: u32 = 10;
    pub const DEFAULT_VOLUME_THRESHOLD: u64 = 0;
    pub const DEFAULT_MAX_CIRCUIT_BREAKERS: usize = 50;
}

/// Event names as seen by subscribers
pub mod events {
    pub const CACHE_ERROR: &str = "cache-error";
    pub const CIRCUIT_OPEN: &str = "circuit-open";
    pub const CIRCUIT_HALF_OPEN: &str = "circuit-half-open";
    pub const CIRCUIT_CLOSE: &str = "circuit-close";

    pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
}

/// Environment variables consulted at startup
pub mod env {
    pub const ENVIRONMENT: &str = "BASTIAN_ENV";
    pub const FALLBACK_ENVIRONMENT: &str = "APP_ENV";
    pub const LOG_FORMAT: &str = "BASTIAN_LOG_FORMAT";
    pub const CONFIG_PREFIX: &str = "BASTIAN";
    pub const DEFAULT_ENVIRONMENT: &str = "development";
}
