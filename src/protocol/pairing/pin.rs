//! SRP-6a PIN pairing over `/pair-setup`
//!
//! The receiver shows a PIN after `/pair-pin-start`. The client proves
//! knowledge of it in two plist round trips: start (user, A) then proof
//! (A, M1). A reply to the proof step may carry M2, which is checked.

use super::{PairingError, messages};
use crate::protocol::crypto::{CryptoContext, SessionKey, SrpClient, SrpProof};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Start,
    Challenge,
    Proof,
    Done,
}

/// Client side of one PIN pairing attempt
pub struct PinPairing {
    identity: String,
    client: SrpClient,
    proof: Option<SrpProof>,
    step: Step,
}

impl PinPairing {
    /// Start an attempt; `identity` is the client instance id
    #[must_use]
    pub fn new(crypto: &CryptoContext, identity: &str, pin: &str) -> Self {
        Self::with_client(identity, crypto.srp_client(identity, pin))
    }

    /// Start an attempt with a prepared SRP client
    #[must_use]
    pub fn with_client(identity: &str, client: SrpClient) -> Self {
        Self {
            identity: identity.to_string(),
            client,
            proof: None,
            step: Step::Start,
        }
    }

    fn expect(&self, step: Step) -> Result<(), PairingError> {
        if self.step == step {
            Ok(())
        } else {
            Err(PairingError::OutOfOrder {
                expected: format!("{step:?}"),
                actual: format!("{:?}", self.step),
            })
        }
    }

    /// Body of the first `/pair-setup` request
    ///
    /// # Errors
    /// Returns an error if called twice or if encoding fails.
    pub fn start_request(&mut self) -> Result<Vec<u8>, PairingError> {
        self.expect(Step::Start)?;
        let body = messages::start_request(&self.identity, self.client.public_key())?;
        self.step = Step::Challenge;
        Ok(body)
    }

    /// Consume the salt/B reply and produce the proof request body
    ///
    /// # Errors
    /// Returns `MalformedResponse` for a reply without salt or pk, and
    /// `Crypto` if B is degenerate.
    pub fn process_challenge(&mut self, reply: &[u8]) -> Result<Vec<u8>, PairingError> {
        self.expect(Step::Challenge)?;
        let challenge = messages::parse_challenge(reply)?;
        let proof = self
            .client
            .compute_proof(&challenge.salt, &challenge.server_public)?;
        let body = messages::proof_request(self.client.public_key(), proof.client_proof())?;
        tracing::trace!(salt_len = challenge.salt.len(), "SRP challenge processed");
        self.proof = Some(proof);
        self.step = Step::Proof;
        Ok(body)
    }

    /// Finish after a 200 to the proof request
    ///
    /// # Errors
    /// Returns `ServerProofMismatch` if the reply carries an M2 that does
    /// not match.
    pub fn finish(&mut self, reply: &[u8]) -> Result<SessionKey, PairingError> {
        self.expect(Step::Proof)?;
        let proof = self.proof.take().ok_or_else(|| PairingError::OutOfOrder {
            expected: "Proof".to_string(),
            actual: "no proof computed".to_string(),
        })?;
        self.step = Step::Done;

        match messages::parse_server_proof(reply)? {
            Some(m2) => proof
                .verify_server(&m2)
                .map_err(|_| PairingError::ServerProofMismatch),
            None => Ok(proof.session_key()),
        }
    }
}
