use base64::{Engine as _, engine::general_purpose};
use rand::{rngs::OsRng, RngCore};

use crate::crypto::keyring::Keyring;
use crate::error::{Result, SessionError};
use crate::models::session::SessionRecord;

/// Prefix shared by every lookup key in the store.
pub const LOOKUP_KEY_PREFIX: &str = "auth:";

/// The size of the random lookup-key suffix in bytes.
const LOOKUP_KEY_ENTROPY: usize = 16;

/// A lookup key recovered from a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedToken {
    /// The store key the token points at.
    pub lookup_key: String,
    /// Position in the keyring of the key that opened it; 0 is active.
    pub key_index: usize,
}

impl OpenedToken {
    /// Whether the token was sealed under a key that is no longer active.
    pub fn is_legacy(&self) -> bool {
        self.key_index > 0
    }
}

/// Turns lookup keys into opaque tokens and back.
pub struct SessionCodec {
    keyring: Keyring,
}

impl SessionCodec {
    /// Creates a codec over `keyring`.
    pub fn new(keyring: Keyring) -> Self {
        Self { keyring }
    }

    /// Generates a fresh `auth:<kind>_<subject>_<random>` lookup key.
    pub fn new_lookup_key(&self, kind: &str, subject_id: &str) -> String {
        let mut suffix = [0u8; LOOKUP_KEY_ENTROPY];
        OsRng.fill_bytes(&mut suffix);
        format!(
            "{}{}_{}_{}",
            LOOKUP_KEY_PREFIX,
            kind,
            subject_id,
            hex::encode(suffix)
        )
    }

    /// Seals a lookup key under the active cipher.
    ///
    /// # Arguments
    ///
    /// * `lookup_key` - The store key the token will point at.
    ///
    /// # Returns
    ///
    /// The token: standard base64 of `nonce || ciphertext`.
    pub fn seal(&self, lookup_key: &str) -> Result<String> {
        let sealed = self.keyring.active_cipher().seal(lookup_key.as_bytes())?;
        Ok(general_purpose::STANDARD.encode(sealed))
    }

    /// Opens a token, trying the active key first and then each legacy key.
    ///
    /// # Returns
    ///
    /// The lookup key and the index of the key that opened it, or
    /// [`SessionError::InvalidToken`] if no key does.
    pub fn open(&self, token: &str) -> Result<OpenedToken> {
        let decoded = general_purpose::STANDARD
            .decode(token)
            .map_err(|_| SessionError::InvalidToken)?;

        for (key_index, cipher) in self.keyring.ciphers() {
            let Ok(plaintext) = cipher.open(&decoded) else {
                continue;
            };

            let lookup_key =
                String::from_utf8(plaintext).map_err(|_| SessionError::InvalidToken)?;

            if key_index > 0 {
                tracing::debug!("🔑 Token opened with legacy key #{}", key_index);
            }

            return Ok(OpenedToken {
                lookup_key,
                key_index,
            });
        }

        Err(SessionError::InvalidToken)
    }

    /// Serializes a record for the store.
    pub fn encode_record(&self, record: &SessionRecord) -> Result<Vec<u8>> {
        sonic_rs::to_vec(record)
            .map_err(|e| SessionError::Serialization(format!("Session serialization failed: {}", e)))
    }

    /// Deserializes a stored record.
    pub fn decode_record(&self, bytes: &[u8]) -> Result<SessionRecord> {
        sonic_rs::from_slice(bytes)
            .map_err(|e| SessionError::Serialization(format!("Invalid session JSON: {}", e)))
    }
}
