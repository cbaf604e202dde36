use crate::crypto::aes::SessionCipher;
use crate::error::{Result, SessionError};

/// An ordered, non-empty set of token ciphers.
///
/// The first configured secret is the active key; every later one is a
/// legacy key kept so tokens sealed before a rotation can still be opened.
/// Rotating means prepending a new secret to the configuration.
pub struct Keyring {
    ciphers: Vec<SessionCipher>,
}

impl Keyring {
    /// Builds a keyring from secrets in configuration order.
    ///
    /// # Arguments
    ///
    /// * `secrets` - 16, 24 or 32 byte secrets; the first becomes the active key.
    ///
    /// # Returns
    ///
    /// A `Result` containing the keyring, or [`SessionError::Configuration`]
    /// if the list is empty or any secret has a bad length.
    pub fn new<I, K>(secrets: I) -> Result<Self>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        let ciphers = secrets
            .into_iter()
            .map(|secret| SessionCipher::from_secret(secret.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        if ciphers.is_empty() {
            return Err(SessionError::Configuration(
                "cipher keys config is empty".to_string(),
            ));
        }

        tracing::info!(
            "🔑 Keyring loaded: AES-{} active, {} legacy key(s)",
            ciphers[0].bits(),
            ciphers.len() - 1
        );

        Ok(Self { ciphers })
    }

    /// The cipher used for every new token.
    pub fn active_cipher(&self) -> &SessionCipher {
        &self.ciphers[0]
    }

    /// All ciphers with their position; index 0 is the active one.
    pub fn ciphers(&self) -> impl Iterator<Item = (usize, &SessionCipher)> {
        self.ciphers.iter().enumerate()
    }
}
