//! Encrypted payload representation.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use plume_core::{PlumeError, PlumeResult};
use serde::{Deserialize, Serialize};

/// AES-256-GCM output as stored next to the owning record.
///
/// All three fields are standard base64. Persist them together; any change to
/// one of them makes decryption fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPayload {
    /// Encrypted bytes, without the tag.
    pub ciphertext: String,
    /// 96-bit nonce, unique per encryption.
    pub iv: String,
    /// 128-bit GCM authentication tag.
    pub auth_tag: String,
}

impl EncryptedPayload {
    /// Encodes raw cipher output.
    #[must_use]
    pub fn from_parts(ciphertext: &[u8], iv: &[u8], auth_tag: &[u8]) -> Self {
        Self {
            ciphertext: STANDARD.encode(ciphertext),
            iv: STANDARD.encode(iv),
            auth_tag: STANDARD.encode(auth_tag),
        }
    }

    pub(crate) fn decoded_ciphertext(&self) -> PlumeResult<Vec<u8>> {
        decode_field("ciphertext", &self.ciphertext)
    }

    pub(crate) fn decoded_iv(&self) -> PlumeResult<Vec<u8>> {
        decode_field("iv", &self.iv)
    }

    pub(crate) fn decoded_auth_tag(&self) -> PlumeResult<Vec<u8>> {
        decode_field("authTag", &self.auth_tag)
    }
}

fn decode_field(name: &str, value: &str) -> PlumeResult<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|_| PlumeError::decryption(format!("malformed payload: {} is not valid base64", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_camel_case_tag() {
        let payload = EncryptedPayload::from_parts(b"ct", b"iv", b"tag");
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["ciphertext"], "Y3Q=");
        assert_eq!(json["iv"], "aXY=");
        assert_eq!(json["authTag"], "dGFn");
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        let payload = EncryptedPayload {
            ciphertext: "Y3Q=".to_string(),
            iv: "%%%".to_string(),
            auth_tag: "dGFn".to_string(),
        };

        assert_eq!(payload.decoded_ciphertext().unwrap(), b"ct");
        let err = payload.decoded_iv().unwrap_err();
        assert!(matches!(err, PlumeError::Decryption(_)));
        assert!(err.to_string().contains("iv"));
    }
}
