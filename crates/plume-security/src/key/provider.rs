//! Symmetric key resolution.
//!
//! Key material is checked eagerly when the provider is built so that a
//! misconfigured production deployment fails at startup. The key itself is
//! computed lazily, exactly once, on first use.

use plume_config::{AppMetadata, EncryptionConfig, ENCRYPTION_KEY_LEN};
use plume_core::{PlumeError, PlumeResult};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::OnceLock;
use tracing::{debug, warn};
use zeroize::{Zeroize, Zeroizing};

/// Domain constant appended to the fallback secret before hashing.
pub const KEY_DERIVATION_DOMAIN: &str = "plume-token-encryption-v1";

/// Development-only secret used when no key material is configured.
///
/// Anything encrypted under it is readable by anyone with the source.
/// Production startup refuses to fall back to it.
const INSECURE_DEFAULT_SECRET: &str = "plume-insecure-development-secret";

/// A 256-bit AES key. Zeroised on drop, never printed.
#[derive(Clone)]
pub struct SymmetricKey([u8; ENCRYPTION_KEY_LEN]);

impl SymmetricKey {
    /// Wraps raw key bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; ENCRYPTION_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

/// Where the process key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Configured key bytes, used as-is.
    Explicit,
    /// SHA-256 of the configured fallback secret.
    Derived,
    /// SHA-256 of the hard-coded development secret.
    InsecureDefault,
}

/// Resolves and holds the single symmetric key used for token encryption.
pub struct KeyProvider {
    source: KeySource,
    secret: Option<Zeroizing<String>>,
    key: OnceLock<SymmetricKey>,
}

impl KeyProvider {
    /// Builds a provider from configuration.
    ///
    /// An explicit key takes precedence over the fallback secret. With
    /// neither configured, production is a configuration error and every
    /// other environment falls back to the insecure development secret.
    ///
    /// # Errors
    /// Returns [`PlumeError::Configuration`] for an undecodable explicit key
    /// or missing key material in production.
    pub fn from_config(config: &EncryptionConfig, app: &AppMetadata) -> PlumeResult<Self> {
        if let Some(bytes) = config.explicit_key_bytes()? {
            return Ok(Self::from_key_bytes(bytes));
        }

        if let Some(secret) = config.fallback_secret() {
            return Ok(Self::from_secret(secret));
        }

        if app.is_production() {
            return Err(PlumeError::configuration(
                "no encryption key or secret configured; refusing to start in production",
            ));
        }

        warn!(
            environment = %app.environment,
            "No encryption key material configured, using the insecure development default"
        );
        Ok(Self {
            source: KeySource::InsecureDefault,
            secret: None,
            key: OnceLock::new(),
        })
    }

    /// Uses the given bytes directly as the key.
    #[must_use]
    pub fn from_key_bytes(bytes: [u8; ENCRYPTION_KEY_LEN]) -> Self {
        Self {
            source: KeySource::Explicit,
            secret: None,
            key: OnceLock::from(SymmetricKey::from_bytes(bytes)),
        }
    }

    /// Derives the key from a secret on first use.
    #[must_use]
    pub fn from_secret(secret: &str) -> Self {
        Self {
            source: KeySource::Derived,
            secret: Some(Zeroizing::new(secret.to_string())),
            key: OnceLock::new(),
        }
    }

    /// Where the key came from.
    #[must_use]
    pub const fn source(&self) -> KeySource {
        self.source
    }

    /// Returns the process key, computing it on the first call.
    ///
    /// Concurrent first calls race safely; every caller sees the same key.
    pub fn key(&self) -> &SymmetricKey {
        self.key.get_or_init(|| {
            let secret = self
                .secret
                .as_deref()
                .map_or(INSECURE_DEFAULT_SECRET, String::as_str);
            debug!(source = ?self.source, "Deriving token encryption key");
            derive_key(secret)
        })
    }

    /// Forces key computation, for eager initialisation at startup.
    pub fn warm(&self) {
        let _ = self.key();
    }
}

impl fmt::Debug for KeyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyProvider")
            .field("source", &self.source)
            .field("initialized", &self.key.get().is_some())
            .finish_non_exhaustive()
    }
}

/// SHA-256(secret || domain).
fn derive_key(secret: &str) -> SymmetricKey {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(KEY_DERIVATION_DOMAIN.as_bytes());
    SymmetricKey::from_bytes(hasher.finalize().into())
}
