use bytes::Bytes;

use crate::error::RaopError;
use crate::protocol::rtp::constants::{FRAMES_PER_PACKET, PCM_BYTES_PER_PACKET};

/// One packet's worth of 16-bit stereo little-endian PCM (352 samples per channel)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    data: Bytes,
}

impl AudioFrame {
    /// Wrap a PCM chunk, checking that it is exactly one frame long
    ///
    /// # Errors
    /// Returns `RaopError::InvalidFrame` for any other length.
    pub fn new(data: impl Into<Bytes>) -> Result<Self, RaopError> {
        let data = data.into();
        if data.len() != PCM_BYTES_PER_PACKET {
            return Err(RaopError::InvalidFrame {
                message: format!(
                    "expected {PCM_BYTES_PER_PACKET} bytes, got {}",
                    data.len()
                ),
            });
        }
        Ok(Self { data })
    }

    /// A frame of digital silence
    #[must_use]
    pub fn silence() -> Self {
        Self {
            data: Bytes::from_static(&[0u8; PCM_BYTES_PER_PACKET]),
        }
    }

    /// Samples per channel
    #[must_use]
    pub fn samples(&self) -> u32 {
        FRAMES_PER_PACKET
    }

    /// Raw PCM bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume into the underlying buffer
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl AsRef<[u8]> for AudioFrame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size_checked() {
        assert!(AudioFrame::new(vec![0u8; PCM_BYTES_PER_PACKET]).is_ok());
        assert!(matches!(
            AudioFrame::new(vec![0u8; 1000]),
            Err(RaopError::InvalidFrame { .. })
        ));
    }

    #[test]
    fn test_silence() {
        let frame = AudioFrame::silence();
        assert_eq!(frame.as_bytes().len(), PCM_BYTES_PER_PACKET);
        assert!(frame.as_bytes().iter().all(|b| *b == 0));
        assert_eq!(frame.samples(), 352);
    }
}
