//! SDP body of the ANNOUNCE request
//!
//! The sender only ever writes one description: a single ALAC audio stream.
//! [`AnnouncedStream`] reads back the handful of lines a receiver acts on.

use std::fmt::Write;

#[cfg(test)]
mod tests;

/// ANNOUNCE body for the RAOP ALAC stream
#[derive(Debug, Clone)]
pub struct AnnounceSdp<'a> {
    /// Decimal session id
    pub session_id: &'a str,
    /// Local address of the control connection
    pub client_ip: &'a str,
    /// Receiver address
    pub host: &'a str,
    /// Receiver latency in samples
    pub latency_samples: u32,
}

fn addr_type(addr: &str) -> &'static str {
    if addr.contains(':') { "IP6" } else { "IP4" }
}

impl AnnounceSdp<'_> {
    /// ALAC stream parameters: 352 frames, 16 bit, stereo, 44.1 kHz
    pub const FMTP: &'static str = "96 352 0 16 40 10 14 2 255 0 0 44100";

    /// Payload type and codec name
    pub const RTPMAP: &'static str = "96 AppleLossless";

    /// Render the SDP text, CRLF line endings
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(256);
        let _ = write!(
            out,
            "v=0\r\n\
             o=iTunes {} 0 IN {} {}\r\n\
             s=iTunes\r\n\
             c=IN {} {}\r\n\
             t=0 0\r\n\
             m=audio 0 RTP/AVP 96\r\n\
             a=rtpmap:{}\r\n\
             a=fmtp:{}\r\n\
             a=min-latency:{}\r\n",
            self.session_id,
            addr_type(self.client_ip),
            self.client_ip,
            addr_type(self.host),
            self.host,
            Self::RTPMAP,
            Self::FMTP,
            self.latency_samples,
        );
        out
    }
}

/// Stream parameters read from an ANNOUNCE body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnouncedStream {
    /// Session id from the `o=` line
    pub session_id: Option<String>,
    /// `a=rtpmap` value
    pub rtpmap: Option<String>,
    /// `a=fmtp` value
    pub fmtp: Option<String>,
    /// `a=min-latency` value in samples
    pub min_latency: Option<u32>,
}

impl AnnouncedStream {
    /// Read an SDP body; `None` unless it declares an audio media section
    ///
    /// Unknown and malformed lines are skipped.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let mut stream = Self::default();
        let mut has_audio = false;

        for line in text.lines().map(str::trim) {
            let Some((kind, value)) = line.split_once('=') else {
                continue;
            };
            match kind {
                "o" => stream.session_id = value.split_whitespace().nth(1).map(String::from),
                "m" => has_audio |= value.split_whitespace().next() == Some("audio"),
                "a" => {
                    let Some((name, value)) = value.split_once(':') else {
                        continue;
                    };
                    match name {
                        "rtpmap" => stream.rtpmap = Some(value.to_string()),
                        "fmtp" => stream.fmtp = Some(value.to_string()),
                        "min-latency" => stream.min_latency = value.trim().parse().ok(),
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        has_audio.then_some(stream)
    }
}
