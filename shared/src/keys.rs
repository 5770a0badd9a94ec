//! Run-wide signing key pair handed to every spawned service
//!
//! Services under test use the pair to trust tokens minted by each other, so
//! one pair is generated per test run and shared by all instances.

use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::errors::{SharedError, SharedResult};

/// Timestamp format used to version key pairs
pub const KEY_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H_%M_%S";

/// Ed25519 key pair with a version timestamp, encoded as base64 strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    pub timestamp: String,
    pub public_key: String,
    pub private_key: String,
}

impl KeyPair {
    /// Generate a fresh pair stamped with the current time
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();

        Self {
            timestamp: Utc::now().format(KEY_TIMESTAMP_FORMAT).to_string(),
            public_key: general_purpose::STANDARD.encode(verifying_key.as_bytes()),
            private_key: general_purpose::STANDARD.encode(signing_key.to_bytes()),
        }
    }

    /// Decode the public half
    pub fn verifying_key(&self) -> SharedResult<VerifyingKey> {
        let bytes = decode_32(&self.public_key)?;
        VerifyingKey::from_bytes(&bytes).map_err(|e| SharedError::InvalidKeyMaterial {
            message: e.to_string(),
        })
    }

    /// Decode the private half
    pub fn signing_key(&self) -> SharedResult<SigningKey> {
        Ok(SigningKey::from_bytes(&decode_32(&self.private_key)?))
    }
}

fn decode_32(encoded: &str) -> SharedResult<[u8; 32]> {
    let bytes = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| SharedError::InvalidKeyMaterial { message: e.to_string() })?;

    bytes.try_into().map_err(|b: Vec<u8>| SharedError::InvalidKeyMaterial {
        message: format!("expected 32 bytes, got {}", b.len()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, Verifier};

    #[test]
    fn test_generated_halves_belong_together() {
        let pair = KeyPair::generate();
        let signing = pair.signing_key().unwrap();
        let verifying = pair.verifying_key().unwrap();

        let signature = signing.sign(b"tenant");
        assert!(verifying.verify(b"tenant", &signature).is_ok());
    }

    #[test]
    fn test_pairs_are_distinct() {
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        assert_ne!(a.private_key, b.private_key);
    }

    #[test]
    fn test_rejects_short_key() {
        let pair = KeyPair {
            timestamp: "2026-01-01T00_00_00".to_string(),
            public_key: general_purpose::STANDARD.encode([1u8; 8]),
            private_key: String::new(),
        };
        assert!(matches!(
            pair.verifying_key(),
            Err(SharedError::InvalidKeyMaterial { .. })
        ));
    }
}
