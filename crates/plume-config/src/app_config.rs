//! Application configuration structures.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use plume_core::{PlumeError, PlumeResult, TelemetryConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Length in bytes of the symmetric encryption key.
pub const ENCRYPTION_KEY_LEN: usize = 32;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Token encryption configuration.
    #[serde(default)]
    pub encryption: EncryptionConfig,

    /// Cache store configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging configuration.
    #[serde(default)]
    pub observability: TelemetryConfig,
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "plume".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

impl AppMetadata {
    /// Returns true when running in production.
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

/// Token encryption configuration.
///
/// Either `key` (base64 of exactly 32 bytes) or `secret` (any string, hashed
/// into a key) should be set. `key` wins when both are present.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionConfig {
    /// Explicit base64-encoded 32-byte key.
    #[serde(skip_serializing)]
    pub key: Option<String>,
    /// Fallback secret the key is derived from.
    #[serde(skip_serializing)]
    pub secret: Option<String>,
}

impl EncryptionConfig {
    /// Returns true when any key material is configured.
    #[must_use]
    pub fn has_key_material(&self) -> bool {
        self.explicit_key().is_some() || self.fallback_secret().is_some()
    }

    /// Non-blank explicit key.
    #[must_use]
    pub fn explicit_key(&self) -> Option<&str> {
        self.key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    /// Non-blank fallback secret.
    #[must_use]
    pub fn fallback_secret(&self) -> Option<&str> {
        self.secret.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Decodes the explicit key, if one is configured.
    ///
    /// # Errors
    /// Returns a configuration error if the key is not valid base64 or does
    /// not decode to exactly [`ENCRYPTION_KEY_LEN`] bytes.
    pub fn explicit_key_bytes(&self) -> PlumeResult<Option<[u8; ENCRYPTION_KEY_LEN]>> {
        let Some(encoded) = self.explicit_key() else {
            return Ok(None);
        };

        let decoded = STANDARD
            .decode(encoded)
            .map_err(|_| PlumeError::configuration("encryption key is not valid base64"))?;

        let bytes: [u8; ENCRYPTION_KEY_LEN] = decoded.as_slice().try_into().map_err(|_| {
            PlumeError::configuration(format!(
                "encryption key must decode to {} bytes, got {}",
                ENCRYPTION_KEY_LEN,
                decoded.len()
            ))
        })?;

        Ok(Some(bytes))
    }
}

impl fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionConfig")
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Cache store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the Redis cache (disabled means every lookup misses).
    pub enabled: bool,
    /// Redis URL.
    pub url: String,
    /// Connection pool size.
    pub pool_size: usize,
    /// Upper bound for a single cache store call in milliseconds.
    pub operation_timeout_ms: u64,
    /// TTL used when callers don't pick one, in seconds.
    pub default_ttl_secs: u64,
    /// Serialise concurrent misses for the same key.
    pub coalesce_misses: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "redis://localhost:6379".to_string(),
            pool_size: 10,
            operation_timeout_ms: 250,
            default_ttl_secs: 300, // 5 minutes
            coalesce_misses: false,
        }
    }
}

impl CacheConfig {
    /// Returns the per-call store timeout as a Duration.
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Returns the default TTL as a Duration.
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}
