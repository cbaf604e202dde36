use aes_gcm::{
    aead::{consts::U12, Aead, KeyInit},
    aes::Aes192,
    Aes128Gcm, Aes256Gcm, AesGcm, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use crate::error::{Result, SessionError};

/// The size of the AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

type Aes192Gcm = AesGcm<Aes192, U12>;

/// An AES-GCM cipher whose strength is picked from the secret's length.
///
/// The expanded key schedule is wiped when the cipher is dropped.
pub enum SessionCipher {
    Aes128(Aes128Gcm),
    Aes192(Aes192Gcm),
    Aes256(Aes256Gcm),
}

impl SessionCipher {
    /// Builds a cipher from a 16, 24 or 32 byte secret.
    pub fn from_secret(secret: &[u8]) -> Result<Self> {
        let invalid = |_| {
            SessionError::Configuration(format!(
                "cipher key must be 16, 24 or 32 bytes, got {}",
                secret.len()
            ))
        };

        match secret.len() {
            16 => Aes128Gcm::new_from_slice(secret).map(Self::Aes128).map_err(invalid),
            24 => Aes192Gcm::new_from_slice(secret).map(Self::Aes192).map_err(invalid),
            32 => Aes256Gcm::new_from_slice(secret).map(Self::Aes256).map_err(invalid),
            n => Err(SessionError::Configuration(format!(
                "cipher key must be 16, 24 or 32 bytes, got {}",
                n
            ))),
        }
    }

    /// The key size in bits, for logging.
    pub fn bits(&self) -> usize {
        match self {
            Self::Aes128(_) => 128,
            Self::Aes192(_) => 192,
            Self::Aes256(_) => 256,
        }
    }

    /// Encrypts `plaintext` under a fresh random nonce.
    ///
    /// Returns `nonce || ciphertext`.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce_bytes = generate_nonce();
        let nonce = Nonce::<U12>::from_slice(&nonce_bytes);

        let ciphertext = match self {
            Self::Aes128(c) => c.encrypt(nonce, plaintext),
            Self::Aes192(c) => c.encrypt(nonce, plaintext),
            Self::Aes256(c) => c.encrypt(nonce, plaintext),
        }
        .map_err(|_| SessionError::InvalidToken)?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Decrypts `nonce || ciphertext` as produced by [`SessionCipher::seal`].
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() < NONCE_SIZE {
            return Err(SessionError::InvalidToken);
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);
        let nonce = Nonce::<U12>::from_slice(nonce_bytes);

        let plaintext = match self {
            Self::Aes128(c) => c.decrypt(nonce, ciphertext),
            Self::Aes192(c) => c.decrypt(nonce, ciphertext),
            Self::Aes256(c) => c.decrypt(nonce, ciphertext),
        };

        plaintext.map_err(|_| SessionError::InvalidToken)
    }
}

/// Generates a new random AES-GCM nonce.
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_all_aes_key_sizes() {
        for (len, bits) in [(16, 128), (24, 192), (32, 256)] {
            let cipher = SessionCipher::from_secret(&vec![7u8; len]).unwrap();
            assert_eq!(cipher.bits(), bits);

            let sealed = cipher.seal(b"auth:user_42_abc").unwrap();
            assert_eq!(cipher.open(&sealed).unwrap(), b"auth:user_42_abc");
        }
    }

    #[test]
    fn rejects_bad_key_length() {
        let err = SessionCipher::from_secret(&[1u8; 20]).err().unwrap();
        assert!(matches!(err, SessionError::Configuration(_)));
    }

    #[test]
    fn fresh_nonce_per_seal() {
        let cipher = SessionCipher::from_secret(&[3u8; 32]).unwrap();
        let a = cipher.seal(b"same").unwrap();
        let b = cipher.seal(b"same").unwrap();
        assert_ne!(a[..NONCE_SIZE], b[..NONCE_SIZE]);
        assert_ne!(a, b);
    }

    #[test]
    fn short_input_is_invalid() {
        let cipher = SessionCipher::from_secret(&[3u8; 16]).unwrap();
        assert!(matches!(cipher.open(&[0u8; 5]), Err(SessionError::InvalidToken)));
    }

    fn wipes_on_drop<T: zeroize::ZeroizeOnDrop>() {}

    #[test]
    fn key_schedules_are_zeroized_on_drop() {
        wipes_on_drop::<aes_gcm::aes::Aes128>();
        wipes_on_drop::<Aes192>();
        wipes_on_drop::<aes_gcm::aes::Aes256>();
    }
}
