use super::constants::PAYLOAD_TYPE_SYNC;
use super::{NtpTimestamp, RtpDecodeError};

/// Control-channel sync packet (20 bytes)
///
/// Tells the receiver which RTP timestamp is playing at which NTP time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPacket {
    /// First sync of a streaming run (`0x90` instead of `0x80`)
    pub first: bool,
    /// Timestamp currently playing: next timestamp minus latency
    pub playing_timestamp: u32,
    /// Wall-clock time the packet was built
    pub ntp_time: NtpTimestamp,
    /// RTP timestamp of the next audio packet
    pub next_timestamp: u32,
}

impl SyncPacket {
    /// Encoded size
    pub const SIZE: usize = 20;

    /// Bytes 2-3, always `07 00`
    const MARKER: [u8; 2] = [0x07, 0x00];

    /// Build a sync packet for `timestamp` with `latency` samples of delay
    ///
    /// The playing timestamp wraps like any other RTP timestamp.
    #[must_use]
    pub fn new(timestamp: u32, latency: u32, ntp_time: NtpTimestamp, first: bool) -> Self {
        Self {
            first,
            playing_timestamp: timestamp.wrapping_sub(latency),
            ntp_time,
            next_timestamp: timestamp,
        }
    }

    /// Encode to bytes
    #[must_use]
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0] = if self.first { 0x90 } else { 0x80 };
        buf[1] = 0x80 | PAYLOAD_TYPE_SYNC;
        buf[2..4].copy_from_slice(&Self::MARKER);
        buf[4..8].copy_from_slice(&self.playing_timestamp.to_be_bytes());
        buf[8..16].copy_from_slice(&self.ntp_time.encode());
        buf[16..20].copy_from_slice(&self.next_timestamp.to_be_bytes());
        buf
    }

    /// Decode from bytes
    ///
    /// # Errors
    ///
    /// Returns `RtpDecodeError` if the buffer is short or not a sync packet.
    pub fn decode(buf: &[u8]) -> Result<Self, RtpDecodeError> {
        if buf.len() < Self::SIZE {
            return Err(RtpDecodeError::BufferTooSmall {
                needed: Self::SIZE,
                have: buf.len(),
            });
        }
        if buf[1] & 0x7F != PAYLOAD_TYPE_SYNC {
            return Err(RtpDecodeError::UnexpectedPayloadType(buf[1] & 0x7F));
        }

        Ok(Self {
            first: buf[0] & 0x10 != 0,
            playing_timestamp: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
            ntp_time: NtpTimestamp::decode(&buf[8..16]).unwrap_or_default(),
            next_timestamp: u32::from_be_bytes([buf[16], buf[17], buf[18], buf[19]]),
        })
    }
}
