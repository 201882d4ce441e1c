use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm, KeyInit, Nonce};

use super::{CryptoError, lengths};

enum Cipher {
    Aes128(Box<Aes128Gcm>),
    Aes256(Box<Aes256Gcm>),
}

/// AES-GCM AEAD cipher, AES-128 or AES-256 depending on key length
pub struct AesGcm {
    cipher: Cipher,
}

impl AesGcm {
    /// Create cipher with a 16- or 32-byte key
    ///
    /// # Errors
    /// Returns `CryptoError::InvalidKeyLength` for any other key length.
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        let invalid = || CryptoError::InvalidKeyLength {
            expected: lengths::AES_128_KEY,
            actual: key.len(),
        };
        let cipher = match key.len() {
            lengths::AES_128_KEY => {
                Cipher::Aes128(Box::new(Aes128Gcm::new_from_slice(key).map_err(|_| invalid())?))
            }
            lengths::AES_256_KEY => {
                Cipher::Aes256(Box::new(Aes256Gcm::new_from_slice(key).map_err(|_| invalid())?))
            }
            _ => return Err(invalid()),
        };
        Ok(Self { cipher })
    }

    /// Encrypt with a 12-byte nonce and optional associated data
    ///
    /// Output is ciphertext followed by the 16-byte tag.
    ///
    /// # Errors
    /// Returns an error for a bad nonce length or cipher failure.
    pub fn encrypt(&self, nonce: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Self::check_nonce(nonce)?;
        let nonce = Nonce::from_slice(nonce);
        let payload = Payload {
            msg: plaintext,
            aad,
        };
        match &self.cipher {
            Cipher::Aes128(c) => c.encrypt(nonce, payload),
            Cipher::Aes256(c) => c.encrypt(nonce, payload),
        }
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
    }

    /// Decrypt and authenticate
    ///
    /// # Errors
    /// Returns `CryptoError::DecryptionFailed` if the tag does not verify.
    pub fn decrypt(&self, nonce: &[u8], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Self::check_nonce(nonce)?;
        let nonce = Nonce::from_slice(nonce);
        let payload = Payload {
            msg: ciphertext,
            aad,
        };
        match &self.cipher {
            Cipher::Aes128(c) => c.decrypt(nonce, payload),
            Cipher::Aes256(c) => c.decrypt(nonce, payload),
        }
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
    }

    fn check_nonce(nonce: &[u8]) -> Result<(), CryptoError> {
        if nonce.len() != lengths::AES_GCM_NONCE {
            return Err(CryptoError::InvalidKeyLength {
                expected: lengths::AES_GCM_NONCE,
                actual: nonce.len(),
            });
        }
        Ok(())
    }
}
