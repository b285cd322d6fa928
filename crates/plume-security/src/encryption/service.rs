//! AES-256-GCM token encryption.

use crate::{EncryptedPayload, KeyProvider};
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::Aes256Gcm;
use plume_config::AppConfig;
use plume_core::{Interface, PlumeError, PlumeResult};
use rand::{rngs::OsRng, RngCore};
use std::sync::Arc;
use tracing::{debug, warn};
use zeroize::Zeroize;

/// GCM nonce length in bytes.
pub const IV_LEN: usize = 12;

/// GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Interface for token encryption, for injection into route handlers.
pub trait TokenCipher: Interface + Send + Sync {
    /// Encrypts a plaintext string under a fresh IV.
    fn encrypt(&self, plaintext: &str) -> PlumeResult<EncryptedPayload>;

    /// Verifies and decrypts a payload.
    fn decrypt(&self, payload: &EncryptedPayload) -> PlumeResult<String>;
}

/// Stateless AES-256-GCM encryption over the process key.
///
/// Cheap to clone. Safe to share across any number of concurrent requests.
#[derive(Clone, Debug)]
pub struct EncryptionService {
    keys: Arc<KeyProvider>,
}

impl EncryptionService {
    /// Creates a service over the given key provider.
    #[must_use]
    pub fn new(keys: Arc<KeyProvider>) -> Self {
        Self { keys }
    }

    /// Builds the key provider from configuration and wraps it.
    ///
    /// # Errors
    /// Fails on invalid or, in production, missing key material.
    pub fn from_config(config: &AppConfig) -> PlumeResult<Self> {
        let keys = KeyProvider::from_config(&config.encryption, &config.app)?;
        Ok(Self::new(Arc::new(keys)))
    }

    /// Returns the underlying key provider.
    #[must_use]
    pub fn key_provider(&self) -> &Arc<KeyProvider> {
        &self.keys
    }

    fn cipher(&self) -> PlumeResult<Aes256Gcm> {
        Aes256Gcm::new_from_slice(self.keys.key().as_bytes())
            .map_err(|_| PlumeError::crypto("invalid AES-256 key length"))
    }

    /// Encrypts `plaintext` with a fresh random IV and no associated data.
    ///
    /// # Errors
    /// Returns [`PlumeError::Crypto`] if the RNG or cipher fails. There is
    /// no unencrypted fallback.
    pub fn encrypt(&self, plaintext: &str) -> PlumeResult<EncryptedPayload> {
        let cipher = self.cipher()?;

        let mut iv = [0u8; IV_LEN];
        OsRng
            .try_fill_bytes(&mut iv)
            .map_err(|e| PlumeError::crypto(format!("random IV generation failed: {}", e)))?;

        let mut sealed = cipher
            .encrypt(GenericArray::from_slice(&iv), plaintext.as_bytes())
            .map_err(|_| PlumeError::crypto("AES-256-GCM encryption failed"))?;

        // aes-gcm appends the tag to the ciphertext
        let auth_tag = sealed.split_off(sealed.len() - TAG_LEN);

        debug!(bytes = plaintext.len(), "Encrypted token payload");
        Ok(EncryptedPayload::from_parts(&sealed, &iv, &auth_tag))
    }

    /// Verifies the tag and decrypts.
    ///
    /// # Errors
    /// Returns [`PlumeError::Decryption`] for malformed fields, a tag
    /// mismatch or non-UTF-8 plaintext. No plaintext is returned on failure.
    pub fn decrypt(&self, payload: &EncryptedPayload) -> PlumeResult<String> {
        let iv = payload.decoded_iv()?;
        if iv.len() != IV_LEN {
            return Err(PlumeError::decryption(format!(
                "malformed payload: iv must be {} bytes, got {}",
                IV_LEN,
                iv.len()
            )));
        }

        let auth_tag = payload.decoded_auth_tag()?;
        if auth_tag.len() != TAG_LEN {
            return Err(PlumeError::decryption(format!(
                "malformed payload: authTag must be {} bytes, got {}",
                TAG_LEN,
                auth_tag.len()
            )));
        }

        let mut sealed = payload.decoded_ciphertext()?;
        sealed.extend_from_slice(&auth_tag);

        let cipher = self.cipher()?;
        let plaintext = cipher
            .decrypt(GenericArray::from_slice(&iv), sealed.as_slice())
            .map_err(|_| {
                warn!("Token decryption failed: authentication tag mismatch");
                PlumeError::decryption("authentication tag mismatch")
            })?;

        String::from_utf8(plaintext).map_err(|e| {
            let mut bytes = e.into_bytes();
            bytes.zeroize();
            PlumeError::decryption("decrypted payload is not valid UTF-8")
        })
    }
}

impl TokenCipher for EncryptionService {
    fn encrypt(&self, plaintext: &str) -> PlumeResult<EncryptedPayload> {
        EncryptionService::encrypt(self, plaintext)
    }

    fn decrypt(&self, payload: &EncryptedPayload) -> PlumeResult<String> {
        EncryptionService::decrypt(self, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    fn service() -> EncryptionService {
        EncryptionService::new(Arc::new(KeyProvider::from_secret("unit-test-secret")))
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let service = service();
        let payload = service.encrypt("ya29.access-token").unwrap();
        assert_eq!(service.decrypt(&payload).unwrap(), "ya29.access-token");
    }

    #[test]
    fn test_field_lengths() {
        let payload = service().encrypt("hello").unwrap();

        assert_eq!(STANDARD.decode(&payload.iv).unwrap().len(), IV_LEN);
        assert_eq!(STANDARD.decode(&payload.auth_tag).unwrap().len(), TAG_LEN);
        assert_eq!(STANDARD.decode(&payload.ciphertext).unwrap().len(), "hello".len());
    }

    #[test]
    fn test_empty_plaintext() {
        let service = service();
        let payload = service.encrypt("").unwrap();

        assert!(payload.ciphertext.is_empty());
        assert_eq!(service.decrypt(&payload).unwrap(), "");
    }

    #[test]
    fn test_wrong_key_fails() {
        let payload = service().encrypt("secret").unwrap();
        let other = EncryptionService::new(Arc::new(KeyProvider::from_secret("another-secret")));

        assert!(matches!(other.decrypt(&payload), Err(PlumeError::Decryption(_))));
    }

    #[test]
    fn test_same_secret_survives_restart() {
        let payload = service().encrypt("persisted").unwrap();
        // A fresh provider stands in for a new process with the same secret.
        assert_eq!(service().decrypt(&payload).unwrap(), "persisted");
    }

    #[test]
    fn test_short_iv_is_malformed() {
        let service = service();
        let mut payload = service.encrypt("secret").unwrap();
        payload.iv = STANDARD.encode([0u8; 8]);

        let err = service.decrypt(&payload).unwrap_err();
        assert!(err.to_string().contains("iv must be 12 bytes"));
    }

    #[test]
    fn test_truncated_tag_is_malformed() {
        let service = service();
        let mut payload = service.encrypt("secret").unwrap();
        payload.auth_tag = STANDARD.encode([0u8; 12]);

        assert!(matches!(service.decrypt(&payload), Err(PlumeError::Decryption(_))));
    }

    #[test]
    fn test_swapped_iv_fails() {
        let service = service();
        let first = service.encrypt("secret").unwrap();
        let second = service.encrypt("secret").unwrap();

        let spliced = EncryptedPayload {
            iv: second.iv,
            ..first
        };
        assert!(matches!(service.decrypt(&spliced), Err(PlumeError::Decryption(_))));
    }

    #[test]
    fn test_via_trait_object() {
        let cipher: Arc<dyn TokenCipher> = Arc::new(service());
        let payload = cipher.encrypt("through-the-interface").unwrap();
        assert_eq!(cipher.decrypt(&payload).unwrap(), "through-the-interface");
    }

    #[test]
    fn test_from_config_in_development() {
        let service = EncryptionService::from_config(&AppConfig::default()).unwrap();
        let payload = service.encrypt("dev").unwrap();
        assert_eq!(service.decrypt(&payload).unwrap(), "dev");
    }
}
