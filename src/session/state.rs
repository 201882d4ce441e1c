use std::fmt;

/// Observable lifecycle of a [`RaopSession`](super::RaopSession)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Created, `connect` not called yet
    Idle,
    /// Control connection open
    Connected,
    /// Receiver demanded a PIN; pairing running
    PairingInProgress,
    /// ANNOUNCE accepted
    Announced,
    /// SETUP accepted, UDP endpoints known
    TransportReady,
    /// RECORD accepted; frames may be sent
    Streaming,
    /// Stopped by the caller; terminal
    Stopped,
    /// A fatal error ended the handshake; resources already released
    Error,
}

impl SessionState {
    /// Whether frames can be sent
    #[must_use]
    pub fn is_streaming(self) -> bool {
        matches!(self, SessionState::Streaming)
    }

    /// Whether the handshake is between `Idle` and `Streaming`
    #[must_use]
    pub fn is_handshaking(self) -> bool {
        matches!(
            self,
            SessionState::Connected
                | SessionState::PairingInProgress
                | SessionState::Announced
                | SessionState::TransportReady
        )
    }

    /// Whether the session is over
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Stopped | SessionState::Error)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Connected => "connected",
            SessionState::PairingInProgress => "pairing",
            SessionState::Announced => "announced",
            SessionState::TransportReady => "transport-ready",
            SessionState::Streaming => "streaming",
            SessionState::Stopped => "stopped",
            SessionState::Error => "error",
        };
        f.write_str(name)
    }
}
