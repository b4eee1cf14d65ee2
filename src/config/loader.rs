//! Configuration Loader
//!
//! Environment-aware configuration loading built on the `config` crate. Sources are
//! layered, later ones winning:
//!
//! 1. `bastian.{toml,yaml,json}` in the configuration directory
//! 2. `bastian.<environment>.{toml,yaml,json}` in the same directory
//! 3. `BASTIAN__<SECTION>__<KEY>` environment variables
//!
//! Every file is optional; missing values fall back to the defaults.

use super::error::{ConfigResult, ConfigurationError};
use super::BastianConfig;
use crate::constants::env as env_vars;
use config::{Config, Environment, File};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const CONFIG_FILE_STEM: &str = "bastian";
const CONFIG_FILE_EXTENSIONS: [&str; 4] = ["toml", "yaml", "yml", "json"];

/// Loaded configuration together with where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: BastianConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    /// This is useful for testing without modifying global environment variables
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_with_sources(config_dir, environment, None)
    }

    /// Load with an explicit set of `BASTIAN__*` variables in place of the process
    /// environment
    pub fn load_with_env_vars(
        config_dir: Option<PathBuf>,
        environment: &str,
        env_vars: HashMap<String, String>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_with_sources(config_dir, environment, Some(env_vars))
    }

    fn load_with_sources(
        config_dir: Option<PathBuf>,
        environment: &str,
        env_overrides: Option<HashMap<String, String>>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let config = Self::load_and_merge_config(&config_directory, environment, env_overrides)?;

        // Validate the loaded configuration
        config.validate()?;

        info!(
            environment = environment,
            components = config.circuit_breakers.component_configs.len(),
            channel_capacity = config.events.channel_capacity,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &BastianConfig {
        &self.config
    }

    /// Get the current environment
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Get the configuration directory
    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Detect current environment from environment variables
    /// BASTIAN_ENV || APP_ENV || 'development'
    pub fn detect_environment() -> String {
        env::var(env_vars::ENVIRONMENT)
            .or_else(|_| env::var(env_vars::FALLBACK_ENVIRONMENT))
            .unwrap_or_else(|_| env_vars::DEFAULT_ENVIRONMENT.to_string())
            .to_lowercase()
    }

    fn default_config_directory() -> PathBuf {
        PathBuf::from("config")
    }

    /// Load and merge configuration with environment-specific overrides
    fn load_and_merge_config(
        config_directory: &Path,
        environment: &str,
        env_overrides: Option<HashMap<String, String>>,
    ) -> ConfigResult<BastianConfig> {
        let environment_source = Environment::with_prefix(env_vars::CONFIG_PREFIX)
            .separator("__")
            .try_parsing(true)
            .source(env_overrides);

        let mut builder = Config::builder();
        for stem in [
            CONFIG_FILE_STEM.to_string(),
            format!("{CONFIG_FILE_STEM}.{environment}"),
        ] {
            for path in Self::existing_files(config_directory, &stem) {
                debug!(path = %path.display(), "Adding configuration file");
                builder = builder.add_source(File::from(path));
            }
        }

        let settings = builder
            .add_source(environment_source)
            .build()
            .map_err(|e| ConfigurationError::load_error(config_directory.display().to_string(), e))?;

        settings.try_deserialize().map_err(|e| {
            ConfigurationError::load_error(
                config_directory.display().to_string(),
                format!("Failed to deserialize configuration: {e}"),
            )
        })
    }

    /// Files named `<stem>.<ext>` for every supported format, in a fixed order
    fn existing_files(config_directory: &Path, stem: &str) -> Vec<PathBuf> {
        CONFIG_FILE_EXTENSIONS
            .iter()
            .map(|extension| config_directory.join(format!("{stem}.{extension}")))
            .filter(|path| path.is_file())
            .collect()
    }
}
