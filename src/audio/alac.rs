//! "Uncompressed" ALAC framing
//!
//! RAOP receivers accept ALAC frames that set the not-compressed flag and
//! carry raw big-endian samples. The frame is a bit stream: a 55-bit header,
//! the sample bytes continuing at bit 55, a 3-bit end tag, then zero padding.

use crate::error::RaopError;

/// Channel field value receivers interpret as stereo
const CHANNELS_FIELD: u32 = 1;

/// End-of-frame tag
const END_TAG: u32 = 0b111;

/// Header size in bits
pub const HEADER_BITS: usize = 3 + 4 + 8 + 4 + 1 + 2 + 1 + 32;

/// Most-significant-bit-first bit writer
#[derive(Debug, Default)]
pub struct BitWriter {
    buf: Vec<u8>,
    /// Bits used in the last byte of `buf` (0 means byte aligned)
    used: u8,
}

impl BitWriter {
    /// Create a writer with room for `bytes` output bytes
    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            buf: Vec::with_capacity(bytes),
            used: 0,
        }
    }

    /// Append the low `nbits` bits of `value`, most significant first
    ///
    /// `nbits` is at most 32.
    pub fn write_bits(&mut self, value: u32, nbits: u8) {
        debug_assert!(nbits <= 32);
        let mut remaining = nbits;
        while remaining > 0 {
            if self.used == 0 {
                self.buf.push(0);
            }
            let free = 8 - self.used;
            let take = free.min(remaining);
            let shift = remaining - take;
            let chunk = ((u64::from(value) >> shift) & ((1u64 << take) - 1)) as u8;
            if let Some(last) = self.buf.last_mut() {
                *last |= chunk << (free - take);
            }
            self.used = (self.used + take) % 8;
            remaining -= take;
        }
    }

    /// Append a full byte
    pub fn write_byte(&mut self, byte: u8) {
        if self.used == 0 {
            self.buf.push(byte);
        } else {
            self.write_bits(u32::from(byte), 8);
        }
    }

    /// Number of bits written so far
    #[must_use]
    pub fn bit_len(&self) -> usize {
        if self.used == 0 {
            self.buf.len() * 8
        } else {
            (self.buf.len() - 1) * 8 + usize::from(self.used)
        }
    }

    /// Finish the stream; the last partial byte is already zero-padded
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Encodes PCM frames into uncompressed ALAC frames
///
/// Holds no state between frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlacFrameEncoder;

impl AlacFrameEncoder {
    /// Create an encoder
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Encoded size for `pcm_len` input bytes
    #[must_use]
    pub fn encoded_len(pcm_len: usize) -> usize {
        (HEADER_BITS + pcm_len * 8 + 3).div_ceil(8)
    }

    /// Encode little-endian 16-bit stereo PCM
    ///
    /// # Errors
    /// Returns `RaopError::InvalidFrame` if `pcm` is not a whole number of
    /// stereo frames (4 bytes each) or holds more samples than the 32-bit
    /// count field can describe.
    pub fn encode(&self, pcm: &[u8]) -> Result<Vec<u8>, RaopError> {
        if pcm.len() % 4 != 0 {
            return Err(RaopError::InvalidFrame {
                message: format!(
                    "PCM length {} is not a whole number of stereo frames",
                    pcm.len()
                ),
            });
        }
        let frames = u32::try_from(pcm.len() / 4).map_err(|_| RaopError::InvalidFrame {
            message: format!("PCM chunk too large ({} bytes)", pcm.len()),
        })?;

        let mut writer = BitWriter::with_capacity(Self::encoded_len(pcm.len()));
        writer.write_bits(CHANNELS_FIELD, 3);
        writer.write_bits(0, 4);
        writer.write_bits(0, 8);
        writer.write_bits(0, 4);
        writer.write_bits(1, 1); // has size
        writer.write_bits(0, 2);
        writer.write_bits(1, 1); // not compressed
        writer.write_bits(frames, 32);

        for sample in pcm.chunks_exact(2) {
            writer.write_byte(sample[1]);
            writer.write_byte(sample[0]);
        }

        writer.write_bits(END_TAG, 3);
        Ok(writer.finish())
    }
}
