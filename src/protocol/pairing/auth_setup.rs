//! X25519 `/auth-setup` exchange and the legacy `/pair-setup` certificate reply
//!
//! Both requests carry `0x01 || client public key`. The receiver answers
//! with its own Curve25519 key, optionally followed by a length-prefixed
//! certificate chain and signature. Neither is verified.

use super::PairingError;
use crate::protocol::crypto::{
    X25519KeyPair, X25519PublicKey, X25519SharedSecret, lengths::X25519_PUBLIC_KEY,
};

/// Request type byte: unencrypted, no MFi-SAP
const UNENCRYPTED: u8 = 0x01;

/// One ephemeral key agreement with a receiver
pub struct AuthSetup {
    keypair: X25519KeyPair,
}

impl AuthSetup {
    /// Wrap an ephemeral key pair
    #[must_use]
    pub fn new(keypair: X25519KeyPair) -> Self {
        Self { keypair }
    }

    /// Request body: `0x01 || pk(32)`
    #[must_use]
    pub fn request_body(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(1 + X25519_PUBLIC_KEY);
        body.push(UNENCRYPTED);
        body.extend_from_slice(self.keypair.public_key().as_bytes());
        body
    }

    /// Derive the shared secret from the first 32 bytes of the reply
    ///
    /// # Errors
    /// Returns `PairingError::MalformedResponse` if the reply is shorter
    /// than a public key.
    pub fn process_response(&self, data: &[u8]) -> Result<X25519SharedSecret, PairingError> {
        let key = data.get(..X25519_PUBLIC_KEY).ok_or_else(|| {
            PairingError::MalformedResponse(format!(
                "auth-setup reply has {} bytes, need {X25519_PUBLIC_KEY}",
                data.len()
            ))
        })?;
        let server_public = X25519PublicKey::from_bytes(key)?;
        Ok(self.keypair.diffie_hellman(&server_public))
    }
}

/// Receiver key material from a legacy `/pair-setup` reply
#[derive(Debug, Clone)]
pub struct ServerAuthMaterial {
    /// Receiver's ephemeral Curve25519 key
    pub public_key: X25519PublicKey,
    /// DER certificate chain (empty if the reply stops after the key)
    pub certificate: Vec<u8>,
    /// Signature over the key exchange, if sent
    pub signature: Option<Vec<u8>>,
}

impl ServerAuthMaterial {
    /// Parse `key(32) [len(u32 BE) cert [len(u32 BE) signature]]`
    ///
    /// # Errors
    /// Returns `PairingError::MalformedResponse` if the key is short or a
    /// length prefix points past the end of the reply.
    pub fn parse(data: &[u8]) -> Result<Self, PairingError> {
        let mut reader = Reader { data, pos: 0 };
        let public_key = X25519PublicKey::from_bytes(reader.take(X25519_PUBLIC_KEY, "public key")?)?;

        let certificate = if reader.is_empty() {
            Vec::new()
        } else {
            reader.length_prefixed("certificate")?.to_vec()
        };

        let signature = if reader.is_empty() {
            None
        } else {
            Some(reader.length_prefixed("signature")?.to_vec())
        };

        Ok(Self {
            public_key,
            certificate,
            signature,
        })
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8], PairingError> {
        let end = self.pos.checked_add(len).filter(|end| *end <= self.data.len());
        let Some(end) = end else {
            return Err(PairingError::MalformedResponse(format!(
                "pair-setup reply truncated in {what}"
            )));
        };
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn length_prefixed(&mut self, what: &str) -> Result<&'a [u8], PairingError> {
        let len_bytes = self.take(4, what)?;
        let len = u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]);
        self.take(len as usize, what)
    }
}
