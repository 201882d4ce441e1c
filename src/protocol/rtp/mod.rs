//! RTP packets for the RAOP audio, control and timing channels

mod ntp;
mod packet;
mod sync;
mod timing;

#[cfg(test)]
mod tests;

pub use ntp::NtpTimestamp;
pub use packet::{RtpDecodeError, RtpHeader, RtpPacketBuilder};
pub use sync::SyncPacket;
pub use timing::{TimingPacket, timing_reply};

/// RTP protocol constants for RAOP
pub mod constants {
    /// Dynamic payload type for AppleLossless audio
    pub const PAYLOAD_TYPE_AUDIO: u8 = 96;

    /// Timing request payload type (`0xD2` with marker)
    pub const PAYLOAD_TYPE_TIMING_REQUEST: u8 = 0x52;

    /// Timing reply payload type (`0xD3` with marker)
    pub const PAYLOAD_TYPE_TIMING_REPLY: u8 = 0x53;

    /// Sync payload type (`0xD4` with marker)
    pub const PAYLOAD_TYPE_SYNC: u8 = 0x54;

    /// Samples per channel in one audio packet
    pub const FRAMES_PER_PACKET: u32 = 352;

    /// Bytes of 16-bit stereo PCM in one audio packet
    pub const PCM_BYTES_PER_PACKET: usize = 1408;

    /// Audio sample rate
    pub const SAMPLE_RATE: u32 = 44100;
}
