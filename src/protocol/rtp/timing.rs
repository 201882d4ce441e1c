use super::NtpTimestamp;
use super::constants::{PAYLOAD_TYPE_TIMING_REPLY, PAYLOAD_TYPE_TIMING_REQUEST};

/// Timing-channel packet (32 bytes)
///
/// Layout after the 8-byte header: origin, receive and transmit NTP
/// timestamps at offsets 8, 16 and 24.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingPacket {
    bytes: [u8; Self::SIZE],
}

impl TimingPacket {
    /// Encoded size
    pub const SIZE: usize = 32;

    /// Recognize a timing request: at least 32 bytes, `0x80 0xD2`
    #[must_use]
    pub fn parse_request(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::SIZE
            || buf[0] != 0x80
            || buf[1] != (0x80 | PAYLOAD_TYPE_TIMING_REQUEST)
        {
            return None;
        }
        let mut bytes = [0u8; Self::SIZE];
        bytes.copy_from_slice(&buf[..Self::SIZE]);
        Some(Self { bytes })
    }

    /// Build a timing request carrying `transmit` at bytes 24..32
    #[must_use]
    pub fn request(transmit: NtpTimestamp) -> Self {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0] = 0x80;
        bytes[1] = 0x80 | PAYLOAD_TYPE_TIMING_REQUEST;
        bytes[24..32].copy_from_slice(&transmit.encode());
        Self { bytes }
    }

    /// Raw packet bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; Self::SIZE] {
        &self.bytes
    }

    /// Transmit timestamp, bytes 24..32
    #[must_use]
    pub fn transmit_time(&self) -> NtpTimestamp {
        NtpTimestamp::decode(&self.bytes[24..32]).unwrap_or_default()
    }

    /// Reply to this request with `now` as both receive and transmit time
    #[must_use]
    pub fn reply(&self, now: NtpTimestamp) -> Self {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0] = 0x80;
        bytes[1] = 0x80 | PAYLOAD_TYPE_TIMING_REPLY;
        // Echo the sender's transmit time as our origin
        bytes[8..16].copy_from_slice(&self.bytes[24..32]);
        bytes[16..24].copy_from_slice(&now.encode());
        bytes[24..32].copy_from_slice(&now.encode());
        Self { bytes }
    }
}

/// Reply bytes for `request`, or `None` if it is not a timing request
#[must_use]
pub fn timing_reply(request: &[u8], now: NtpTimestamp) -> Option<[u8; TimingPacket::SIZE]> {
    TimingPacket::parse_request(request).map(|req| *req.reply(now).as_bytes())
}
