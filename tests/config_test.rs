//! Configuration loading and wiring into the cache

mod common;

use bastian::{BatchOriginHandler, CircuitState, ConfigManager, LookupRequest, ReadThroughCache};
use common::*;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn repo_config_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")
}

#[test]
fn test_shipped_configuration_loads() {
    let manager = ConfigManager::load_from_directory_with_env(Some(repo_config_dir()), "development")
        .unwrap();
    let config = manager.config();

    assert_eq!(manager.environment(), "development");
    assert_eq!(config.events.channel_capacity, 1000);

    let cuisine = config.circuit_breakers.config_for_component("cuisine-service");
    assert!(cuisine.enabled);
    assert_eq!(cuisine.error_threshold_percentage, 50);

    let unknown = config.circuit_breakers.config_for_component("menu-service");
    assert!(!unknown.enabled);
}

#[test]
fn test_test_environment_overrides_shipped_values() {
    let manager =
        ConfigManager::load_from_directory_with_env(Some(repo_config_dir()), "test").unwrap();
    let cuisine = manager
        .config()
        .circuit_breakers
        .config_for_component("cuisine-service");

    assert_eq!(manager.config().events.channel_capacity, 64);
    assert_eq!(cuisine.timeout_ms, 100);
    // Untouched keys keep the base file's value
    assert_eq!(cuisine.rolling_window_ms, 10_000);
}

#[test]
fn test_environment_variables_take_precedence() {
    let env_vars = HashMap::from([(
        "BASTIAN__EVENTS__CHANNEL_CAPACITY".to_string(),
        "16".to_string(),
    )]);

    let manager =
        ConfigManager::load_with_env_vars(Some(repo_config_dir()), "test", env_vars).unwrap();

    assert_eq!(manager.config().events.channel_capacity, 16);
}

#[tokio::test(start_paused = true)]
async fn test_cache_applies_per_service_breaker_settings() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("bastian.toml"),
        r#"
[circuit_breakers.component_configs.flaky-service]
enabled = true
timeout_ms = 100
error_threshold_percentage = 50
reset_timeout_ms = 1000
volume_threshold = 1
"#,
    )
    .unwrap();

    let manager =
        ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "production")
            .unwrap();
    let cache = ReadThroughCache::from_config(None, manager.config());
    let handler = CountingBatchHandler::failing();

    let lookup = |service: &str| {
        let handler: Arc<dyn BatchOriginHandler<Cuisine>> = handler.clone();
        LookupRequest::with_shared_handler("cuisine", [1], handler).with_service_name(service)
    };

    cache.lookup(lookup("flaky-service")).await.unwrap_err();
    cache.lookup(lookup("steady-service")).await.unwrap_err();

    let breakers = cache.circuit_breakers();
    let flaky = breakers.get_circuit_breaker("flaky-service");
    assert_eq!(flaky.state(), CircuitState::Open);
    assert_eq!(flaky.config().timeout, Duration::from_millis(100));

    // Services without a section fall back to the (disabled) default
    let steady = breakers.get_circuit_breaker("steady-service");
    assert!(!steady.config().enabled);
    assert_eq!(steady.state(), CircuitState::Closed);
}

#[test]
fn test_invalid_component_is_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("bastian.toml"),
        r#"
[circuit_breakers.component_configs.broken]
enabled = true
rolling_buckets = 0
"#,
    )
    .unwrap();

    let error =
        ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "production")
            .unwrap_err();

    assert!(error.to_string().contains("broken"));
}
