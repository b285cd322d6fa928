//! Unified error types for the Plume crates.

use thiserror::Error;

/// Unified error type for Plume.
///
/// Crypto and configuration errors propagate to the caller. Cache errors are
/// produced by store adapters and swallowed by the cache-aside layer.
#[derive(Error, Debug)]
pub enum PlumeError {
    // ============ Configuration Errors ============
    /// Missing or invalid configuration, including key material
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ============ Crypto Errors ============
    /// The cipher primitive itself failed
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Authentication tag mismatch or malformed payload
    #[error("Decryption failed: {0}")]
    Decryption(String),

    // ============ Infrastructure Errors ============
    /// Cache store unreachable or failing
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    /// Timeout error
    #[error("Operation timed out: {0}")]
    Timeout(String),

    // ============ Internal Errors ============
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PlumeError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Crypto(_) => "CRYPTO_ERROR",
            Self::Decryption(_) => "DECRYPTION_ERROR",
            Self::CacheUnavailable(_) => "CACHE_UNAVAILABLE",
            Self::Timeout(_) => "TIMEOUT",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration<T: Into<String>>(message: T) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a crypto error.
    #[must_use]
    pub fn crypto<T: Into<String>>(message: T) -> Self {
        Self::Crypto(message.into())
    }

    /// Creates a decryption error.
    #[must_use]
    pub fn decryption<T: Into<String>>(message: T) -> Self {
        Self::Decryption(message.into())
    }

    /// Creates a cache-unavailable error.
    #[must_use]
    pub fn cache_unavailable<T: Into<String>>(message: T) -> Self {
        Self::CacheUnavailable(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// Checks if this error indicates a tampered or corrupted payload.
    #[must_use]
    pub const fn is_tampering(&self) -> bool {
        matches!(self, Self::Decryption(_))
    }
}

impl From<serde_json::Error> for PlumeError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("JSON serialization error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(PlumeError::configuration("no key").error_code(), "CONFIGURATION_ERROR");
        assert_eq!(PlumeError::crypto("bad key").error_code(), "CRYPTO_ERROR");
        assert_eq!(PlumeError::decryption("tag").error_code(), "DECRYPTION_ERROR");
        assert_eq!(PlumeError::cache_unavailable("down").error_code(), "CACHE_UNAVAILABLE");
        assert_eq!(PlumeError::Timeout("t".to_string()).error_code(), "TIMEOUT");
        assert_eq!(PlumeError::internal("err").error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_tampering_errors() {
        assert!(PlumeError::decryption("tag mismatch").is_tampering());
        assert!(!PlumeError::crypto("bad key length").is_tampering());
    }

    #[test]
    fn test_error_display() {
        let err = PlumeError::decryption("authentication tag mismatch");
        assert_eq!(err.to_string(), "Decryption failed: authentication tag mismatch");

        let err = PlumeError::configuration("encryption key must be 32 bytes");
        assert!(err.to_string().contains("32 bytes"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: PlumeError = json_err.into();
        assert!(matches!(err, PlumeError::Internal(_)));
    }

    #[test]
    fn test_from_anyhow() {
        let err: PlumeError = anyhow::anyhow!("wrapped").into();
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
        assert_eq!(err.to_string(), "wrapped");
    }
}
