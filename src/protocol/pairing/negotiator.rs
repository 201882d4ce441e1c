use super::{AuthSetup, PairingError, PinPairing, PinProvider, ServerAuthMaterial};
use crate::error::RaopError;
use crate::protocol::crypto::{CryptoContext, SessionKey, X25519SharedSecret};
use crate::protocol::rtsp::headers::{content_types, names};
use crate::protocol::rtsp::{Headers, Method, RtspClient, RtspResponse};

/// Request paths used during pairing
pub mod paths {
    /// Curve25519 key exchange
    pub const AUTH_SETUP: &str = "/auth-setup";
    /// Asks the receiver to show its PIN
    pub const PAIR_PIN_START: &str = "/pair-pin-start";
    /// SRP exchange and legacy key exchange
    pub const PAIR_SETUP: &str = "/pair-setup";
}

/// Runs pairing exchanges over an open RTSP connection
///
/// `base_headers` (client instance, DACP id, active remote) go on every
/// request in front of the exchange-specific ones.
pub struct PairingNegotiator {
    crypto: CryptoContext,
    identity: String,
    base_headers: Headers,
}

impl PairingNegotiator {
    /// Create a negotiator; `identity` is the client instance id
    #[must_use]
    pub fn new(crypto: CryptoContext, identity: impl Into<String>, base_headers: Headers) -> Self {
        Self {
            crypto,
            identity: identity.into(),
            base_headers,
        }
    }

    fn headers(&self, content_type: Option<&str>) -> Headers {
        let mut headers = self.base_headers.clone();
        if let Some(ct) = content_type {
            headers.insert(names::CONTENT_TYPE, ct);
        }
        headers
    }

    async fn post(
        &self,
        rtsp: &mut RtspClient,
        path: &'static str,
        content_type: Option<&str>,
        body: Vec<u8>,
    ) -> Result<RtspResponse, RaopError> {
        let response = rtsp
            .send_request(Method::Post, path, self.headers(content_type), Some(body))
            .await?;
        tracing::debug!(path, status = response.status.as_u16(), "pairing step");
        Ok(response)
    }

    /// X25519 `/auth-setup`
    ///
    /// # Errors
    /// Returns `PairingFailed` for a non-success status or a reply shorter
    /// than 32 bytes; transport errors pass through.
    pub async fn auth_setup(&self, rtsp: &mut RtspClient) -> Result<X25519SharedSecret, RaopError> {
        let exchange = AuthSetup::new(self.crypto.ephemeral_keypair());
        let response = self
            .post(
                rtsp,
                paths::AUTH_SETUP,
                Some(content_types::OCTET_STREAM),
                exchange.request_body(),
            )
            .await?;
        if !response.is_success() {
            return Err(PairingError::Rejected {
                step: paths::AUTH_SETUP,
                status: response.status.as_u16(),
            }
            .into());
        }

        let secret = exchange.process_response(&response.body)?;
        tracing::trace!(fingerprint = %secret.fingerprint(), "auth-setup shared secret");
        Ok(secret)
    }

    /// Legacy `/pair-setup` with `0x01 || pk`, returning the parsed reply
    /// and the resulting shared secret
    ///
    /// # Errors
    /// Returns `PairingFailed` for a non-success status or a malformed reply.
    pub async fn legacy_pair_setup(
        &self,
        rtsp: &mut RtspClient,
    ) -> Result<(ServerAuthMaterial, X25519SharedSecret), RaopError> {
        let exchange = AuthSetup::new(self.crypto.ephemeral_keypair());
        let response = self
            .post(
                rtsp,
                paths::PAIR_SETUP,
                Some(content_types::OCTET_STREAM),
                exchange.request_body(),
            )
            .await?;
        if !response.is_success() {
            return Err(PairingError::Rejected {
                step: paths::PAIR_SETUP,
                status: response.status.as_u16(),
            }
            .into());
        }

        let material = ServerAuthMaterial::parse(&response.body)?;
        let secret = exchange.process_response(&response.body)?;
        tracing::debug!(
            cert_len = material.certificate.len(),
            signed = material.signature.is_some(),
            "legacy pair-setup reply parsed"
        );
        Ok((material, secret))
    }

    /// SRP PIN pairing: `/pair-pin-start`, then the two `/pair-setup` steps
    ///
    /// # Errors
    /// Returns `PairingFailed` when the PIN is rejected (403 on the proof
    /// step), the provider has no PIN, a reply is malformed, or the server
    /// proof does not verify. Not retried here.
    pub async fn pair_with_pin(
        &self,
        rtsp: &mut RtspClient,
        pins: &dyn PinProvider,
    ) -> Result<SessionKey, RaopError> {
        tracing::info!("receiver requires PIN pairing");
        let response = self.post(rtsp, paths::PAIR_PIN_START, None, Vec::new()).await?;
        if !response.is_success() {
            return Err(PairingError::Rejected {
                step: paths::PAIR_PIN_START,
                status: response.status.as_u16(),
            }
            .into());
        }

        let pin = pins.pin().await.ok_or(PairingError::NoPin)?;
        let mut attempt = PinPairing::new(&self.crypto, &self.identity, &pin);

        let start = attempt.start_request()?;
        let response = self
            .post(
                rtsp,
                paths::PAIR_SETUP,
                Some(content_types::BINARY_PLIST),
                start,
            )
            .await?;
        if !response.is_success() {
            return Err(PairingError::Rejected {
                step: paths::PAIR_SETUP,
                status: response.status.as_u16(),
            }
            .into());
        }

        let proof = attempt.process_challenge(&response.body)?;
        let response = self
            .post(
                rtsp,
                paths::PAIR_SETUP,
                Some(content_types::BINARY_PLIST),
                proof,
            )
            .await?;
        if !response.is_success() {
            if response.is_forbidden() {
                tracing::warn!("receiver rejected the PIN");
            }
            return Err(PairingError::Rejected {
                step: paths::PAIR_SETUP,
                status: response.status.as_u16(),
            }
            .into());
        }

        let key = attempt.finish(&response.body)?;
        tracing::info!("PIN pairing complete");
        Ok(key)
    }
}
