/// Well-known RTSP header names
pub mod names {
    /// Request sequence number, echoed by the response
    pub const CSEQ: &str = "CSeq";
    /// Body media type
    pub const CONTENT_TYPE: &str = "Content-Type";
    /// Body length in bytes
    pub const CONTENT_LENGTH: &str = "Content-Length";
    /// Session id assigned by SETUP
    pub const SESSION: &str = "Session";
    /// UDP port negotiation for SETUP
    pub const TRANSPORT: &str = "Transport";
    /// Client identification
    pub const USER_AGENT: &str = "User-Agent";
    /// Starting `seq` and `rtptime` for RECORD
    pub const RTP_INFO: &str = "RTP-Info";
    /// Playback range for RECORD
    pub const RANGE: &str = "Range";
    /// Methods supported by the receiver (OPTIONS reply)
    pub const PUBLIC: &str = "Public";
}

/// RAOP-specific header names
pub mod raop {
    /// Client instance ID
    pub const CLIENT_INSTANCE: &str = "Client-Instance";
    /// DACP ID for remote control
    pub const DACP_ID: &str = "DACP-ID";
    /// Active remote token
    pub const ACTIVE_REMOTE: &str = "Active-Remote";
}

/// Content types used on the control channel
pub mod content_types {
    /// ANNOUNCE session description
    pub const SDP: &str = "application/sdp";
    /// SET_PARAMETER text body
    pub const PARAMETERS: &str = "text/parameters";
    /// Raw pairing and auth-setup bodies
    pub const OCTET_STREAM: &str = "application/octet-stream";
    /// Binary property list (`/info`, pair-setup)
    pub const BINARY_PLIST: &str = "application/x-apple-binary-plist";
}

/// RTSP header collection
///
/// Headers keep the order they were inserted in, so a request goes out on
/// the wire exactly as the caller built it. Lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    inner: Vec<(String, String)>,
}

impl Headers {
    /// Create empty headers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header
    ///
    /// An existing header with the same name (case-insensitive) is replaced
    /// in place, keeping its position; otherwise the header is appended.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .inner
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            Some(slot) => *slot = (name, value),
            None => self.inner.push((name, value)),
        }
    }

    /// Insert a header only when no header with that name exists
    pub fn insert_if_absent(&mut self, name: &str, value: impl Into<String>) {
        if !self.contains(name) {
            self.inner.push((name.to_string(), value.into()));
        }
    }

    /// Remove a header, returning its value
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self
            .inner
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))?;
        Some(self.inner.remove(idx).1)
    }

    /// Get header value (case-insensitive)
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Check if header exists
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Get `CSeq` value
    #[must_use]
    pub fn cseq(&self) -> Option<u32> {
        self.get(names::CSEQ)?.trim().parse().ok()
    }

    /// Get Content-Length value
    ///
    /// Returns `None` when the header is missing or not a number.
    #[must_use]
    pub fn content_length(&self) -> Option<usize> {
        self.get(names::CONTENT_LENGTH)?.trim().parse().ok()
    }

    /// Get Content-Type value
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.get(names::CONTENT_TYPE)
    }

    /// Get Session value
    #[must_use]
    pub fn session(&self) -> Option<&str> {
        self.get(names::SESSION)
    }

    /// Iterate over all headers in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of headers
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

impl Extend<(String, String)> for Headers {
    fn extend<I: IntoIterator<Item = (String, String)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}
