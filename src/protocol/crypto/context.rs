use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use super::{CryptoError, SrpClient, SrpGroup, SrpServer, X25519KeyPair};

/// Crypto setup shared by everything that pairs with a receiver
///
/// Parsing the SRP modulus and hashing the group constants happens once,
/// here. The context also owns the random source: SRP exponents, X25519
/// keys, session ids and initial RTP positions all draw from it. Construct
/// a context up front and hand clones to sessions; clones share the same
/// source and there is no process-wide registration.
#[derive(Debug, Clone)]
pub struct CryptoContext {
    srp_group: Arc<SrpGroup>,
    rng: Arc<Mutex<StdRng>>,
}

impl CryptoContext {
    /// Build a context for the 2048-bit Apple SRP group, seeded from the OS
    ///
    /// # Errors
    /// Returns an error if the group parameters cannot be initialized.
    pub fn new() -> Result<Self, CryptoError> {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Build a context whose random source is seeded with `seed`
    ///
    /// Every key, id and exponent becomes reproducible. Meant for tests and
    /// captures; never pair with a real receiver this way.
    ///
    /// # Errors
    /// Returns an error if the group parameters cannot be initialized.
    pub fn from_seed(seed: u64) -> Result<Self, CryptoError> {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Result<Self, CryptoError> {
        Ok(Self {
            srp_group: Arc::new(SrpGroup::apple_2048()?),
            rng: Arc::new(Mutex::new(rng)),
        })
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The SRP group in use
    #[must_use]
    pub fn srp_group(&self) -> Arc<SrpGroup> {
        Arc::clone(&self.srp_group)
    }

    /// SRP client with a random private exponent
    #[must_use]
    pub fn srp_client(&self, identity: &str, pin: &str) -> SrpClient {
        SrpClient::new(
            self.srp_group(),
            identity.as_bytes(),
            pin.as_bytes(),
            &mut *self.rng(),
        )
    }

    /// SRP server session with a random private exponent
    #[must_use]
    pub fn srp_server(&self, identity: &str, pin: &str, salt: &[u8]) -> SrpServer {
        SrpServer::new(
            self.srp_group(),
            identity.as_bytes(),
            pin.as_bytes(),
            salt,
            &mut *self.rng(),
        )
    }

    /// Fresh ephemeral X25519 key pair
    #[must_use]
    pub fn ephemeral_keypair(&self) -> X25519KeyPair {
        X25519KeyPair::generate(&mut *self.rng())
    }

    /// `len` random bytes
    #[must_use]
    pub fn random_bytes(&self, len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        self.rng().fill_bytes(&mut bytes);
        bytes
    }

    /// Random 32-bit value
    #[must_use]
    pub fn random_u32(&self) -> u32 {
        self.rng().next_u32()
    }
}
