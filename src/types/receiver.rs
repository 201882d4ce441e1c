use std::fmt;

/// A RAOP receiver the client can stream to
///
/// This is the `(name, host, port)` tuple produced by discovery, or built by
/// hand when the receiver address is already known.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiverInfo {
    /// Human-readable receiver name (e.g., "Living Room")
    pub name: String,

    /// Host name or IP address
    pub host: String,

    /// RTSP control port
    pub port: u16,
}

impl ReceiverInfo {
    /// Create receiver info from its parts
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
        }
    }

    /// `host:port` string suitable for `TcpStream::connect`
    #[must_use]
    pub fn authority(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            // Bare IPv6 literal
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for ReceiverInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.authority())
    }
}
