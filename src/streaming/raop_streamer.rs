//! RTP packetization of the ALAC stream

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use bytes::Bytes;

use crate::audio::AlacFrameEncoder;
use crate::error::RaopError;
use crate::protocol::rtp::{RtpHeader, RtpPacketBuilder};

/// Sequence, timestamp and marker state for one streaming run
///
/// The streamer is the only writer of the RTP timestamp. Sync senders read
/// it through [`shared_timestamp`](Self::shared_timestamp).
#[derive(Debug)]
pub struct RaopStreamer {
    sequence: u16,
    timestamp: Arc<AtomicU32>,
    ssrc: u32,
    encoder: AlacFrameEncoder,
    builder: RtpPacketBuilder,
    /// Marker bit goes on the first packet only
    is_first_packet: bool,
    frames_since_sync: u32,
    sync_every: u32,
}

impl RaopStreamer {
    /// Create a streamer starting at `sequence`/`timestamp`
    ///
    /// A sync is due after every `sync_every` frames (at least 1).
    #[must_use]
    pub fn new(sequence: u16, timestamp: u32, ssrc: u32, sync_every: u32) -> Self {
        Self {
            sequence,
            timestamp: Arc::new(AtomicU32::new(timestamp)),
            ssrc,
            encoder: AlacFrameEncoder::new(),
            builder: RtpPacketBuilder::new(),
            is_first_packet: true,
            frames_since_sync: 0,
            sync_every: sync_every.max(1),
        }
    }

    /// Sequence number of the next packet
    #[must_use]
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    /// RTP timestamp of the next packet
    #[must_use]
    pub fn timestamp(&self) -> u32 {
        self.timestamp.load(Ordering::Acquire)
    }

    /// Stream SSRC
    #[must_use]
    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    /// Read handle on the timestamp counter
    #[must_use]
    pub fn shared_timestamp(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.timestamp)
    }

    /// Encode one PCM frame into a complete RTP packet and advance
    ///
    /// The sequence number advances by one and the timestamp by
    /// `pcm.len() / 4`, both wrapping.
    ///
    /// # Errors
    /// Returns `InvalidFrame` if the PCM cannot be encoded; nothing
    /// advances in that case.
    pub fn encode_frame(&mut self, pcm: &[u8]) -> Result<Bytes, RaopError> {
        let payload = self.encoder.encode(pcm)?;
        let timestamp = self.timestamp();
        let header = RtpHeader::audio(self.sequence, timestamp, self.ssrc, self.is_first_packet);
        let packet = self.builder.build(&header, &payload);

        self.is_first_packet = false;
        self.sequence = self.sequence.wrapping_add(1);
        #[allow(clippy::cast_possible_truncation)]
        let samples = (pcm.len() / 4) as u32;
        self.timestamp
            .store(timestamp.wrapping_add(samples), Ordering::Release);
        self.frames_since_sync += 1;

        Ok(packet)
    }

    /// Whether the periodic frame-count sync is due; resets the count
    pub fn take_sync_due(&mut self) -> bool {
        if self.frames_since_sync >= self.sync_every {
            self.frames_since_sync = 0;
            true
        } else {
            false
        }
    }
}
