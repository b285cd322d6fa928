//! # Plume Security
//!
//! Protects social-platform tokens before they are persisted.
//!
//! - [`KeyProvider`] resolves the single process-wide AES-256 key, either
//!   from an explicit base64 key or by hashing a fallback secret.
//! - [`EncryptionService`] performs AES-256-GCM encrypt/decrypt of strings
//!   into an [`EncryptedPayload`] (base64 ciphertext, IV and tag).
//! - [`SealedCredentials`] seals an access/refresh token pair and reports a
//!   disconnected integration when the stored tokens no longer decrypt.

pub mod credentials;
pub mod encryption;
pub mod key;

pub use credentials::*;
pub use encryption::*;
pub use key::*;
