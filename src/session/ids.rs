use crate::protocol::crypto::CryptoContext;

/// Identifiers a sender presents to the receiver for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIds {
    /// Decimal session id, used in the request URL and SDP origin
    pub session_id: String,
    /// 16 uppercase hex chars; sent as both `Client-Instance` and `DACP-ID`
    pub client_instance: String,
    /// Decimal `Active-Remote` token
    pub active_remote: String,
}

impl SessionIds {
    /// Use fixed identifiers
    pub fn new(
        session_id: impl Into<String>,
        client_instance: impl Into<String>,
        active_remote: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            client_instance: client_instance.into(),
            active_remote: active_remote.into(),
        }
    }

    /// Random identifiers
    ///
    /// The session id is a nine or ten digit number in
    /// `100_000_000..1_100_000_000`.
    #[must_use]
    pub fn generate(crypto: &CryptoContext) -> Self {
        let session_id = u64::from(crypto.random_u32()) % 1_000_000_000 + 100_000_000;
        let client_instance: String = crypto
            .random_bytes(8)
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect();
        Self {
            session_id: session_id.to_string(),
            client_instance,
            active_remote: crypto.random_u32().to_string(),
        }
    }
}
