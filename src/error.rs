use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::protocol::crypto::CryptoError;
use crate::protocol::rtsp::RtspCodecError;

/// Errors that can occur while driving a RAOP session
#[derive(Debug, Error)]
pub enum RaopError {
    // ===== Connection Errors =====
    /// TCP connect, read or write failed
    #[error("connection failed to {host}:{port}: {message}")]
    ConnectionFailed {
        /// Receiver host
        host: String,
        /// Receiver RTSP port
        port: u16,
        /// Description of the failure
        message: String,
        /// The underlying source of the error
        #[source]
        source: Option<io::Error>,
    },

    /// Receiver closed the control connection
    #[error("receiver closed the control connection")]
    Disconnected,

    /// Operation timed out
    #[error("operation timed out after {duration:?}")]
    Timeout {
        /// The timeout that elapsed
        duration: Duration,
    },

    // ===== Handshake Errors =====
    /// Non-success response to a handshake step
    #[error("{method} failed with status {status}")]
    HandshakeFailed {
        /// RTSP method that failed
        method: String,
        /// Status code returned by the receiver
        status: u16,
    },

    /// Receiver answered 403 and no PIN source is configured
    #[error("pairing required (403 on {method})")]
    PairingRequired {
        /// RTSP method that was rejected
        method: String,
    },

    /// Pairing was rejected or the receiver sent a malformed pairing response
    #[error("pairing failed: {message}")]
    PairingFailed {
        /// Description of the failure
        message: String,
    },

    // ===== Streaming Errors =====
    /// Per-frame encode or UDP send failure
    #[error("transport error: {message}")]
    Transport {
        /// Description of the failure
        message: String,
        /// The underlying source of the error
        #[source]
        source: Option<io::Error>,
    },

    /// UDP receive failure on a listener loop
    #[error("{channel} listener failed: {source}")]
    Listener {
        /// Listener name ("control" or "timing")
        channel: &'static str,
        /// The underlying receive error
        #[source]
        source: io::Error,
    },

    /// PCM chunk has the wrong shape for a frame
    #[error("invalid audio frame: {message}")]
    InvalidFrame {
        /// Description of the problem
        message: String,
    },

    // ===== Protocol Errors =====
    /// RTSP response could not be parsed
    #[error("RTSP error: {0}")]
    Rtsp(#[from] RtspCodecError),

    /// Cryptographic operation failed
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    // ===== I/O Errors =====
    /// Network I/O error
    #[error("network error: {0}")]
    Network(#[from] io::Error),

    /// mDNS discovery failed
    #[error("discovery failed: {message}")]
    Discovery {
        /// Description of the failure
        message: String,
    },

    // ===== State Errors =====
    /// Operation not valid in current state
    #[error("invalid state: {message} (current state: {current_state})")]
    InvalidState {
        /// Description of why the state is invalid
        message: String,
        /// The current state
        current_state: String,
    },
}

impl RaopError {
    /// Check if the caller can recover without tearing the session down
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PairingRequired { .. }
                | Self::PairingFailed { .. }
                | Self::Timeout { .. }
                | Self::Transport { .. }
        )
    }

    /// Check if this error indicates connection loss
    #[must_use]
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            Self::Disconnected | Self::ConnectionFailed { .. } | Self::Timeout { .. }
        )
    }

    pub(crate) fn invalid_state(message: impl Into<String>, state: impl ToString) -> Self {
        Self::InvalidState {
            message: message.into(),
            current_state: state.to_string(),
        }
    }
}

/// Result type alias for RAOP operations
pub type Result<T> = std::result::Result<T, RaopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RaopError::HandshakeFailed {
            method: "ANNOUNCE".to_string(),
            status: 500,
        };
        assert_eq!(err.to_string(), "ANNOUNCE failed with status 500");
    }

    #[test]
    fn test_error_is_recoverable() {
        assert!(
            RaopError::PairingFailed {
                message: "bad pin".to_string()
            }
            .is_recoverable()
        );
        assert!(
            RaopError::Timeout {
                duration: Duration::from_secs(1)
            }
            .is_recoverable()
        );
        assert!(
            !RaopError::HandshakeFailed {
                method: "SETUP".to_string(),
                status: 453,
            }
            .is_recoverable()
        );
    }

    #[test]
    fn test_error_is_connection_lost() {
        assert!(RaopError::Disconnected.is_connection_lost());
        assert!(
            !RaopError::PairingRequired {
                method: "OPTIONS".to_string()
            }
            .is_connection_lost()
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let err: RaopError = io_err.into();

        assert!(matches!(err, RaopError::Network(_)));
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RaopError>();
    }
}
