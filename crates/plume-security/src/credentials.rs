//! Sealed social-account credentials.

use crate::{EncryptedPayload, TokenCipher};
use plume_core::PlumeResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Plaintext tokens for a connected social account.
#[derive(Clone, PartialEq, Eq)]
pub struct SocialCredentials {
    /// OAuth access token.
    pub access_token: String,
    /// OAuth refresh token, when the platform issues one.
    pub refresh_token: Option<String>,
}

impl fmt::Debug for SocialCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocialCredentials")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Encrypted form of [`SocialCredentials`], ready to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealedCredentials {
    pub access_token: EncryptedPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<EncryptedPayload>,
}

/// Outcome of opening stored credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialState {
    /// Tokens decrypted and can be used.
    Active(SocialCredentials),
    /// Tokens could not be decrypted; the account must be reconnected.
    Disconnected,
}

impl SealedCredentials {
    /// Encrypts each present token under its own IV.
    pub fn seal(cipher: &dyn TokenCipher, credentials: &SocialCredentials) -> PlumeResult<Self> {
        let access_token = cipher.encrypt(&credentials.access_token)?;
        let refresh_token = credentials
            .refresh_token
            .as_deref()
            .map(|token| cipher.encrypt(token))
            .transpose()?;

        Ok(Self {
            access_token,
            refresh_token,
        })
    }

    /// Decrypts both tokens, failing if either does not verify.
    pub fn open(&self, cipher: &dyn TokenCipher) -> PlumeResult<SocialCredentials> {
        let access_token = cipher.decrypt(&self.access_token)?;
        let refresh_token = self
            .refresh_token
            .as_ref()
            .map(|payload| cipher.decrypt(payload))
            .transpose()?;

        Ok(SocialCredentials {
            access_token,
            refresh_token,
        })
    }

    /// Like [`open`](Self::open), but maps any failure to
    /// [`CredentialState::Disconnected`] so a request can carry on.
    pub fn open_or_disconnect(&self, cipher: &dyn TokenCipher, account_id: &str) -> CredentialState {
        match self.open(cipher) {
            Ok(credentials) => CredentialState::Active(credentials),
            Err(e) => {
                warn!(
                    account_id = %account_id,
                    error_code = e.error_code(),
                    tampered = e.is_tampering(),
                    "Stored credentials failed to decrypt, treating account as disconnected"
                );
                CredentialState::Disconnected
            }
        }
    }
}
