//! Configuration validation module.
//!
//! Collects every problem in one pass so startup fails with the full list
//! rather than the first error.

use crate::{AppConfig, AppMetadata, CacheConfig, EncryptionConfig};
use plume_core::TelemetryConfig;
use std::fmt;
use url::Url;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    /// No encryption key or fallback secret in production.
    MissingKeyMaterial,
    /// Explicit encryption key failed to decode.
    InvalidEncryptionKey { reason: String },
    /// Fallback secret is too short for production use.
    SecretTooShort { actual: usize, minimum: usize },
    /// URL format is invalid.
    InvalidUrl { url_type: String, message: String },
    /// Pool size is zero or exceeds maximum allowed.
    InvalidPoolSize { value: usize, maximum: usize },
    /// Timeout value must be positive.
    NonPositiveTimeout { name: String, value: u64 },
    /// Log level is invalid.
    InvalidLogLevel { value: String },
    /// Environment name is empty.
    MissingEnvironment,
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingKeyMaterial => {
                write!(
                    f,
                    "encryption.key or encryption.secret is required in production"
                )
            }
            Self::InvalidEncryptionKey { reason } => {
                write!(f, "Invalid encryption key: {}", reason)
            }
            Self::SecretTooShort { actual, minimum } => {
                write!(
                    f,
                    "Encryption secret too short: {} characters (minimum {})",
                    actual, minimum
                )
            }
            Self::InvalidUrl { url_type, message } => {
                write!(f, "Invalid {} URL: {}", url_type, message)
            }
            Self::InvalidPoolSize { value, maximum } => {
                write!(
                    f,
                    "Invalid pool size: {} (must be between 1 and {})",
                    value, maximum
                )
            }
            Self::NonPositiveTimeout { name, value } => {
                write!(f, "Timeout '{}' must be positive, got {}", name, value)
            }
            Self::InvalidLogLevel { value } => {
                write!(
                    f,
                    "Invalid log level: '{}' (valid: trace, debug, info, warn, error)",
                    value
                )
            }
            Self::MissingEnvironment => write!(f, "app.environment cannot be empty"),
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Result of configuration validation containing all errors found.
#[derive(Debug)]
pub struct ValidationResult {
    errors: Vec<ConfigValidationError>,
}

impl ValidationResult {
    fn new() -> Self {
        Self { errors: Vec::new() }
    }

    fn add_error(&mut self, error: ConfigValidationError) {
        self.errors.push(error);
    }

    /// Converts to Result, returning Err with all errors if any exist.
    pub fn into_result(self) -> Result<(), Vec<ConfigValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Minimum fallback secret length accepted in production.
    pub const MIN_SECRET_LENGTH: usize = 32;
    /// Maximum connection pool size.
    const MAX_POOL_SIZE: usize = 1000;
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut result = ValidationResult::new();

        Self::validate_app(&config.app, &mut result);
        Self::validate_encryption(&config.encryption, &config.app, &mut result);
        Self::validate_cache(&config.cache, &mut result);
        Self::validate_observability(&config.observability, &mut result);

        result.into_result()
    }

    fn validate_app(config: &AppMetadata, result: &mut ValidationResult) {
        if config.environment.trim().is_empty() {
            result.add_error(ConfigValidationError::MissingEnvironment);
        }
    }

    /// Key material is mandatory in production; elsewhere its absence is only
    /// warned about by the loader.
    fn validate_encryption(
        config: &EncryptionConfig,
        app: &AppMetadata,
        result: &mut ValidationResult,
    ) {
        if let Err(e) = config.explicit_key_bytes() {
            result.add_error(ConfigValidationError::InvalidEncryptionKey {
                reason: e.to_string(),
            });
        }

        if !app.is_production() {
            return;
        }

        if !config.has_key_material() {
            result.add_error(ConfigValidationError::MissingKeyMaterial);
            return;
        }

        if config.explicit_key().is_none() {
            if let Some(secret) = config.fallback_secret() {
                if secret.len() < Self::MIN_SECRET_LENGTH {
                    result.add_error(ConfigValidationError::SecretTooShort {
                        actual: secret.len(),
                        minimum: Self::MIN_SECRET_LENGTH,
                    });
                }
            }
        }
    }

    fn validate_cache(config: &CacheConfig, result: &mut ValidationResult) {
        if !config.enabled {
            return;
        }

        match Url::parse(&config.url) {
            Ok(url) if url.scheme() == "redis" || url.scheme() == "rediss" => {}
            Ok(_) => result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: "URL must start with redis:// or rediss://".to_string(),
            }),
            Err(e) => result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: e.to_string(),
            }),
        }

        if config.pool_size == 0 || config.pool_size > Self::MAX_POOL_SIZE {
            result.add_error(ConfigValidationError::InvalidPoolSize {
                value: config.pool_size,
                maximum: Self::MAX_POOL_SIZE,
            });
        }

        if config.operation_timeout_ms == 0 {
            result.add_error(ConfigValidationError::NonPositiveTimeout {
                name: "cache.operation_timeout_ms".to_string(),
                value: 0,
            });
        }
        if config.default_ttl_secs == 0 {
            result.add_error(ConfigValidationError::NonPositiveTimeout {
                name: "cache.default_ttl_secs".to_string(),
                value: 0,
            });
        }
    }

    fn validate_observability(config: &TelemetryConfig, result: &mut ValidationResult) {
        let level = config.log_level.to_lowercase();
        if !Self::VALID_LOG_LEVELS.contains(&level.as_str()) {
            result.add_error(ConfigValidationError::InvalidLogLevel {
                value: config.log_level.clone(),
            });
        }
    }
}

/// Formats validation errors for display.
pub fn format_validation_errors(errors: &[ConfigValidationError]) -> String {
    let mut output = String::from("Configuration validation failed:\n");
    for (i, error) in errors.iter().enumerate() {
        output.push_str(&format!("  {}. {}\n", i + 1, error));
    }
    output
}
