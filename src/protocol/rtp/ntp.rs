use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// NTP timestamp (64-bit, seconds since 1900-01-01)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct NtpTimestamp {
    /// Seconds since NTP epoch
    pub seconds: u32,
    /// Fractional seconds (1/2^32 of a second)
    pub fraction: u32,
}

impl NtpTimestamp {
    /// NTP epoch offset from Unix epoch (70 years in seconds)
    pub const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

    /// Current wall-clock time
    #[must_use]
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Convert a wall-clock instant
    ///
    /// Seconds wrap at 2^32 (the 2036 NTP era rollover).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_system_time(time: SystemTime) -> Self {
        let since_unix = time.duration_since(UNIX_EPOCH).unwrap_or_default();
        Self::from_unix_duration(since_unix)
    }

    /// Convert a duration since the Unix epoch
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_unix_duration(since_unix: Duration) -> Self {
        let seconds = since_unix.as_secs().wrapping_add(Self::NTP_UNIX_OFFSET) as u32;
        let fraction = ((u64::from(since_unix.subsec_nanos()) << 32) / 1_000_000_000) as u32;
        Self { seconds, fraction }
    }

    /// Packed 64-bit value: seconds in the high word, fraction in the low
    #[must_use]
    pub fn to_u64(self) -> u64 {
        (u64::from(self.seconds) << 32) | u64::from(self.fraction)
    }

    /// Unpack a 64-bit value
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_u64(value: u64) -> Self {
        Self {
            seconds: (value >> 32) as u32,
            fraction: value as u32,
        }
    }

    /// Encode to 8 big-endian bytes
    #[must_use]
    pub fn encode(&self) -> [u8; 8] {
        self.to_u64().to_be_bytes()
    }

    /// Decode from the first 8 bytes of `buf`
    ///
    /// Returns `None` if `buf` is shorter than 8 bytes.
    #[must_use]
    pub fn decode(buf: &[u8]) -> Option<Self> {
        let bytes: [u8; 8] = buf.get(..8)?.try_into().ok()?;
        Some(Self::from_u64(u64::from_be_bytes(bytes)))
    }
}
