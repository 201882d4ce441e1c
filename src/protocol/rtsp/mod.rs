//! RTSP control channel for RAOP
//!
//! Message types and a sans-IO response codec, plus [`RtspClient`] which
//! drives them over a persistent TCP connection.

mod client;
mod codec;
pub mod headers;
mod request;
mod response;
mod transport;


pub use client::RtspClient;
pub use codec::{RtspCodec, RtspCodecError};
pub use headers::Headers;
pub use request::{RtspRequest, RtspRequestBuilder};
pub use response::{RtspResponse, StatusCode};
pub use transport::{ServerPorts, TransportHeader, TransportParseError, client_transport};

use std::fmt;

/// RTSP methods used by a RAOP sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Capability probe (`OPTIONS *`)
    Options,
    /// Announce stream information (SDP)
    Announce,
    /// Set up transport and session
    Setup,
    /// Start streaming
    Record,
    /// Set parameter (volume)
    SetParameter,
    /// Tear down session
    Teardown,
    /// POST for pairing/auth
    Post,
    /// GET for receiver info
    Get,
}

impl Method {
    /// Convert to RTSP method string
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Options => "OPTIONS",
            Method::Announce => "ANNOUNCE",
            Method::Setup => "SETUP",
            Method::Record => "RECORD",
            Method::SetParameter => "SET_PARAMETER",
            Method::Teardown => "TEARDOWN",
            Method::Post => "POST",
            Method::Get => "GET",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "OPTIONS" => Some(Method::Options),
            "ANNOUNCE" => Some(Method::Announce),
            "SETUP" => Some(Method::Setup),
            "RECORD" => Some(Method::Record),
            "SET_PARAMETER" => Some(Method::SetParameter),
            "TEARDOWN" => Some(Method::Teardown),
            "POST" => Some(Method::Post),
            "GET" => Some(Method::Get),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
