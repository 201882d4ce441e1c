use hkdf::Hkdf;
use sha2::Sha512;

use super::{CryptoError, lengths};

/// HKDF-SHA512 for key derivation
pub struct HkdfSha512 {
    hkdf: Hkdf<Sha512>,
}

impl HkdfSha512 {
    /// Create HKDF instance from input key material
    ///
    /// # Arguments
    /// * `salt` - Optional salt (can be None or empty)
    /// * `ikm` - Input key material
    #[must_use]
    pub fn new(salt: Option<&[u8]>, ikm: &[u8]) -> Self {
        Self {
            hkdf: Hkdf::<Sha512>::new(salt, ikm),
        }
    }

    /// Expand to derive output key material
    ///
    /// # Errors
    /// Returns `CryptoError::KeyDerivationFailed` if `length` exceeds
    /// 255 * 64 bytes.
    pub fn expand(&self, info: &[u8], length: usize) -> Result<Vec<u8>, CryptoError> {
        let mut okm = vec![0u8; length];
        self.hkdf
            .expand(info, &mut okm)
            .map_err(|_| CryptoError::KeyDerivationFailed(format!("cannot expand to {length} bytes")))?;
        Ok(okm)
    }

    /// Expand into fixed-size array
    ///
    /// # Errors
    /// Same as [`expand`](Self::expand).
    pub fn expand_fixed<const N: usize>(&self, info: &[u8]) -> Result<[u8; N], CryptoError> {
        let mut okm = [0u8; N];
        self.hkdf
            .expand(info, &mut okm)
            .map_err(|_| CryptoError::KeyDerivationFailed(format!("cannot expand to {N} bytes")))?;
        Ok(okm)
    }
}

/// One-shot HKDF-SHA512 derivation
///
/// # Errors
/// Same as [`HkdfSha512::expand`].
pub fn derive_key(
    salt: Option<&[u8]>,
    ikm: &[u8],
    info: &[u8],
    length: usize,
) -> Result<Vec<u8>, CryptoError> {
    HkdfSha512::new(salt, ikm).expand(info, length)
}

/// AES-GCM key and nonce derived from a pairing secret
///
/// The RTP audio path does not use these; they are available for receivers
/// that expect an encrypted follow-up exchange.
pub struct StreamKeys {
    /// AES-128 key
    pub key: [u8; lengths::AES_128_KEY],
    /// Base nonce
    pub nonce: [u8; lengths::AES_GCM_NONCE],
}

impl StreamKeys {
    /// Derive from an SRP session key or X25519 shared secret
    ///
    /// # Errors
    /// Propagates HKDF failures.
    pub fn derive(secret: &[u8]) -> Result<Self, CryptoError> {
        let key = HkdfSha512::new(Some(b"Pair-Setup-AES-Key".as_slice()), secret).expand_fixed(b"")?;
        let nonce = HkdfSha512::new(Some(b"Pair-Setup-AES-IV".as_slice()), secret).expand_fixed(b"")?;
        Ok(Self { key, nonce })
    }
}

impl Drop for StreamKeys {
    fn drop(&mut self) {
        zeroize::Zeroize::zeroize(&mut self.key);
    }
}
