//! Receiver pairing and authentication
//!
//! Two exchanges are supported: the ephemeral X25519 `/auth-setup`
//! handshake most receivers accept unconditionally, and SRP-6a PIN pairing
//! for receivers that answer 403 until paired. The legacy certificate reply
//! to `/pair-setup` is parsed but never verified.

pub mod auth_setup;
pub mod messages;
mod negotiator;
pub mod pin;


use async_trait::async_trait;

pub use auth_setup::{AuthSetup, ServerAuthMaterial};
pub use negotiator::{PairingNegotiator, paths};
pub use pin::PinPairing;

use crate::error::RaopError;
use crate::protocol::crypto::CryptoError;

/// Source of the PIN a receiver displays
///
/// Called once per pairing attempt, after `/pair-pin-start` made the
/// receiver show the PIN. `None` abandons the attempt.
#[async_trait]
pub trait PinProvider: Send + Sync {
    /// Obtain the PIN
    async fn pin(&self) -> Option<String>;
}

/// A PIN known up front
#[derive(Debug, Clone)]
pub struct StaticPin(String);

impl StaticPin {
    /// Wrap a fixed PIN
    #[must_use]
    pub fn new(pin: impl Into<String>) -> Self {
        Self(pin.into())
    }
}

#[async_trait]
impl PinProvider for StaticPin {
    async fn pin(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Pairing errors
#[derive(Debug, thiserror::Error)]
pub enum PairingError {
    /// Receiver answered a pairing request with a non-success status
    #[error("{step} rejected with status {status}")]
    Rejected {
        /// Request path
        step: &'static str,
        /// Status code
        status: u16,
    },

    /// Reply body is missing fields or too short
    #[error("malformed pairing response: {0}")]
    MalformedResponse(String),

    /// Binary plist could not be read or written
    #[error("plist error: {0}")]
    Plist(String),

    /// Server proof M2 does not match
    #[error("server proof verification failed")]
    ServerProofMismatch,

    /// PIN provider returned nothing
    #[error("no PIN available")]
    NoPin,

    /// Steps called out of order
    #[error("pairing step out of order: expected {expected}, at {actual}")]
    OutOfOrder {
        /// Step that was expected
        expected: String,
        /// Step the attempt was at
        actual: String,
    },

    /// Cryptographic failure
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl From<PairingError> for RaopError {
    fn from(err: PairingError) -> Self {
        RaopError::PairingFailed {
            message: err.to_string(),
        }
    }
}
