//! RTSP `Transport` header handling
//!
//! The sender advertises its control and timing ports in SETUP; the receiver
//! answers with its own audio, control and timing ports:
//! `RTP/AVP/UDP;unicast;mode=record;server_port=6000;control_port=6001;timing_port=6002`

use thiserror::Error;

/// Parsed `Transport` header
///
/// Keeps the protocol spec and every `;`-separated parameter in order. Flag
/// parameters (`unicast`) have no value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportHeader {
    /// Protocol spec, e.g. `RTP/AVP/UDP`
    pub protocol: String,
    params: Vec<(String, Option<String>)>,
}

impl TransportHeader {
    /// Parse a `Transport` header value
    ///
    /// # Errors
    /// Returns `TransportParseError::MissingProtocol` for an empty value.
    pub fn parse(value: &str) -> Result<Self, TransportParseError> {
        let mut parts = value.split(';').map(str::trim);

        let protocol = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or(TransportParseError::MissingProtocol)?
            .to_string();

        let params = parts
            .filter(|p| !p.is_empty())
            .map(|p| match p.split_once('=') {
                Some((k, v)) => (k.trim().to_string(), Some(v.trim().to_string())),
                None => (p.to_string(), None),
            })
            .collect();

        Ok(Self { protocol, params })
    }

    /// Value of a `key=value` parameter
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .and_then(|(_, v)| v.as_deref())
    }

    /// Check for a flag parameter such as `unicast`
    #[must_use]
    pub fn has_flag(&self, flag: &str) -> bool {
        self.params
            .iter()
            .any(|(k, v)| v.is_none() && k.eq_ignore_ascii_case(flag))
    }

    /// Parse a port parameter
    ///
    /// # Errors
    /// Returns `TransportParseError::InvalidPort` if present but not a port.
    pub fn port(&self, key: &str) -> Result<Option<u16>, TransportParseError> {
        self.get(key)
            .map(|v| {
                v.parse::<u16>().map_err(|_| TransportParseError::InvalidPort {
                    key: key.to_string(),
                    value: v.to_string(),
                })
            })
            .transpose()
    }
}

/// Receiver ports announced in the SETUP response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerPorts {
    /// Audio data port (`server_port`)
    pub audio: u16,
    /// Control/sync port (`control_port`)
    pub control: u16,
    /// Timing port (`timing_port`)
    pub timing: u16,
}

impl ServerPorts {
    /// Extract the three receiver ports from a SETUP response header
    ///
    /// `server_port` is required. Receivers that omit `control_port` or
    /// `timing_port` get 0 for them, which disables that channel.
    ///
    /// # Errors
    /// Returns an error if `server_port` is missing or any port is malformed.
    pub fn from_header(value: &str) -> Result<Self, TransportParseError> {
        let header = TransportHeader::parse(value)?;
        let audio = header
            .port("server_port")?
            .ok_or(TransportParseError::MissingServerPort)?;
        Ok(Self {
            audio,
            control: header.port("control_port")?.unwrap_or(0),
            timing: header.port("timing_port")?.unwrap_or(0),
        })
    }
}

/// `Transport` value a sender puts in its SETUP request
#[must_use]
pub fn client_transport(control_port: u16, timing_port: u16) -> String {
    format!(
        "RTP/AVP/UDP;unicast;interleaved=0-1;mode=record;control_port={control_port};timing_port={timing_port}"
    )
}

/// Errors parsing a `Transport` header
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportParseError {
    #[error("missing protocol specification")]
    MissingProtocol,

    #[error("missing server_port")]
    MissingServerPort,

    #[error("invalid port {key}={value}")]
    InvalidPort { key: String, value: String },
}
