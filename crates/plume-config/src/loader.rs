//! Configuration loader with layered sources.

use crate::{format_validation_errors, AppConfig, ConfigValidator};
use config::{Config, ConfigError, Environment, File};
use plume_core::PlumeError;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Configuration loader with runtime refresh support.
#[derive(Clone)]
pub struct ConfigLoader {
    config: Arc<RwLock<AppConfig>>,
    config_dir: String,
    environment: String,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// The environment is read from `PLUME_ENVIRONMENT` (default
    /// `development`). Configuration is loaded from, in order:
    /// 1. `config/default.toml` - Default values
    /// 2. `config/{environment}.toml` - Environment-specific overrides
    /// 3. `config/local.toml` - Local overrides
    /// 4. Environment variables with `PLUME_` prefix and `__` separator
    pub fn new(config_dir: impl Into<String>) -> Result<Self, PlumeError> {
        // Load .env file if present
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment =
            std::env::var("PLUME_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        Self::for_environment(config_dir, environment)
    }

    /// Creates a loader for an explicit environment name.
    pub fn for_environment(
        config_dir: impl Into<String>,
        environment: impl Into<String>,
    ) -> Result<Self, PlumeError> {
        let config_dir = config_dir.into();
        let environment = environment.into();
        let config = Self::load_config(&config_dir, &environment)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_dir,
            environment,
        })
    }

    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> Result<Self, PlumeError> {
        Self::new("./config")
    }

    /// Returns the current configuration.
    pub async fn get(&self) -> AppConfig {
        self.config.read().await.clone()
    }

    /// Reloads the configuration from disk.
    ///
    /// The previous configuration stays in place if the new one is invalid.
    pub async fn reload(&self) -> Result<(), PlumeError> {
        let new_config = Self::load_config(&self.config_dir, &self.environment)?;
        let mut config = self.config.write().await;
        *config = new_config;
        info!("Configuration reloaded successfully");
        Ok(())
    }

    fn load_config(config_dir: &str, environment: &str) -> Result<AppConfig, PlumeError> {
        info!("Loading configuration for environment: {}", environment);

        let mut builder = Config::builder();

        let default_path = format!("{}/default.toml", config_dir);
        if Path::new(&default_path).exists() {
            debug!("Loading default config from: {}", default_path);
            builder = builder.add_source(File::with_name(&default_path).required(false));
        }

        let env_path = format!("{}/{}.toml", config_dir, environment);
        if Path::new(&env_path).exists() {
            debug!("Loading environment config from: {}", env_path);
            builder = builder.add_source(File::with_name(&env_path).required(false));
        }

        // Local overrides (not committed to version control)
        let local_path = format!("{}/local.toml", config_dir);
        if Path::new(&local_path).exists() {
            debug!("Loading local config from: {}", local_path);
            builder = builder.add_source(File::with_name(&local_path).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix("PLUME")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_error_to_plume_error)?;

        let mut app_config: AppConfig = config
            .try_deserialize()
            .map_err(config_error_to_plume_error)?;
        app_config.app.environment = environment.to_string();

        Self::validate_config(&app_config)?;

        Ok(app_config)
    }

    fn validate_config(config: &AppConfig) -> Result<(), PlumeError> {
        ConfigValidator::validate(config)
            .map_err(|errors| PlumeError::Configuration(format_validation_errors(&errors)))?;

        if !config.encryption.has_key_material() {
            warn!(
                environment = %config.app.environment,
                "No encryption key or secret configured; tokens will be encrypted with the insecure development default"
            );
        }

        Ok(())
    }

    /// Gets a specific configuration value by dotted key path.
    pub async fn get_value<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let config = self.config.read().await;
        let json = serde_json::to_value(&*config).ok()?;

        let mut current = &json;
        for part in key.split('.') {
            current = current.get(part)?;
        }

        serde_json::from_value(current.clone()).ok()
    }
}

fn config_error_to_plume_error(err: ConfigError) -> PlumeError {
    PlumeError::Configuration(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) {
        fs::write(dir.path().join(name), contents).unwrap();
    }

    fn dir_str(dir: &TempDir) -> String {
        dir.path().to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_loads_defaults_without_files() {
        let dir = TempDir::new().unwrap();
        let loader = ConfigLoader::for_environment(dir_str(&dir), "test").unwrap();

        let config = loader.get().await;
        assert_eq!(config.app.environment, "test");
        assert_eq!(config.cache.pool_size, 10);
    }

    #[tokio::test]
    async fn test_environment_file_overrides_default() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "default.toml",
            "[cache]\noperation_timeout_ms = 100\ndefault_ttl_secs = 60\n",
        );
        write(&dir, "staging.toml", "[cache]\noperation_timeout_ms = 500\n");

        let loader = ConfigLoader::for_environment(dir_str(&dir), "staging").unwrap();
        let config = loader.get().await;

        assert_eq!(config.cache.operation_timeout_ms, 500);
        assert_eq!(config.cache.default_ttl_secs, 60);
    }

    #[tokio::test]
    async fn test_production_without_key_material_fails() {
        let dir = TempDir::new().unwrap();
        let result = ConfigLoader::for_environment(dir_str(&dir), "production");

        match result {
            Err(PlumeError::Configuration(message)) => {
                assert!(message.contains("required in production"));
            }
            _ => panic!("expected configuration error"),
        }
    }

    #[tokio::test]
    async fn test_production_with_secret_loads() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "production.toml",
            &format!("[encryption]\nsecret = \"{}\"\n", "x".repeat(40)),
        );

        let loader = ConfigLoader::for_environment(dir_str(&dir), "production").unwrap();
        let config = loader.get().await;
        assert!(config.app.is_production());
        assert!(config.encryption.has_key_material());
    }

    #[tokio::test]
    async fn test_reload_picks_up_changes() {
        let dir = TempDir::new().unwrap();
        write(&dir, "default.toml", "[cache]\ncoalesce_misses = false\n");
        let loader = ConfigLoader::for_environment(dir_str(&dir), "development").unwrap();
        assert!(!loader.get().await.cache.coalesce_misses);

        write(&dir, "default.toml", "[cache]\ncoalesce_misses = true\n");
        loader.reload().await.unwrap();
        assert!(loader.get().await.cache.coalesce_misses);
    }

    #[tokio::test]
    async fn test_get_value_by_path() {
        let dir = TempDir::new().unwrap();
        let loader = ConfigLoader::for_environment(dir_str(&dir), "development").unwrap();

        let ttl: Option<u64> = loader.get_value("cache.default_ttl_secs").await;
        assert_eq!(ttl, Some(300));

        let secret: Option<String> = loader.get_value("encryption.secret").await;
        assert_eq!(secret, None);
    }
}
