use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use super::constants::PAYLOAD_TYPE_AUDIO;

/// Errors decoding RTP-framed packets
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RtpDecodeError {
    #[error("buffer too small: need {needed} bytes, have {have}")]
    BufferTooSmall { needed: usize, have: usize },

    #[error("invalid RTP version: {0}")]
    InvalidVersion(u8),

    #[error("unexpected payload type: {0:#04x}")]
    UnexpectedPayloadType(u8),
}

/// 12-byte RTP header of a RAOP audio packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpHeader {
    /// Marker bit (first packet of a streaming run)
    pub marker: bool,
    /// Payload type (7 bits)
    pub payload_type: u8,
    /// Sequence number
    pub sequence: u16,
    /// RTP timestamp in samples
    pub timestamp: u32,
    /// Synchronization source ID
    pub ssrc: u32,
}

impl RtpHeader {
    /// Standard RTP header size
    pub const SIZE: usize = 12;

    /// Header for an AppleLossless audio packet
    #[must_use]
    pub fn audio(sequence: u16, timestamp: u32, ssrc: u32, marker: bool) -> Self {
        Self {
            marker,
            payload_type: PAYLOAD_TYPE_AUDIO,
            sequence,
            timestamp,
            ssrc,
        }
    }

    /// Encode header to bytes
    #[must_use]
    pub fn encode(&self) -> [u8; 12] {
        let mut buf = [0u8; 12];

        // V=2, no padding, no extension, no CSRC
        buf[0] = 0x80;
        buf[1] = (u8::from(self.marker) << 7) | (self.payload_type & 0x7F);
        buf[2..4].copy_from_slice(&self.sequence.to_be_bytes());
        buf[4..8].copy_from_slice(&self.timestamp.to_be_bytes());
        buf[8..12].copy_from_slice(&self.ssrc.to_be_bytes());

        buf
    }

    /// Decode header from bytes
    ///
    /// # Errors
    ///
    /// Returns `RtpDecodeError` if the buffer is too small or the version is not 2.
    pub fn decode(buf: &[u8]) -> Result<Self, RtpDecodeError> {
        if buf.len() < Self::SIZE {
            return Err(RtpDecodeError::BufferTooSmall {
                needed: Self::SIZE,
                have: buf.len(),
            });
        }

        let version = buf[0] >> 6;
        if version != 2 {
            return Err(RtpDecodeError::InvalidVersion(version));
        }

        Ok(Self {
            marker: buf[1] & 0x80 != 0,
            payload_type: buf[1] & 0x7F,
            sequence: u16::from_be_bytes([buf[2], buf[3]]),
            timestamp: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
            ssrc: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
        })
    }
}

/// Wraps encoded audio frames in RTP headers
///
/// Holds a reusable buffer so steady-state packet building does not
/// allocate.
#[derive(Debug, Default)]
pub struct RtpPacketBuilder {
    buf: BytesMut,
}

impl RtpPacketBuilder {
    /// Create a builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(RtpHeader::SIZE + 1500),
        }
    }

    /// Header followed by `payload`
    #[must_use]
    pub fn build(&mut self, header: &RtpHeader, payload: &[u8]) -> Bytes {
        self.buf.reserve(RtpHeader::SIZE + payload.len());
        self.buf.put_slice(&header.encode());
        self.buf.put_slice(payload);
        self.buf.split().freeze()
    }
}
