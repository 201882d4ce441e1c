use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of per-session counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Audio packets handed to the socket
    pub frames_sent: u64,
    /// Frames lost to encode or send failures, or evicted from the capture queue
    pub frames_dropped: u64,
    /// Sync packets sent on the control channel
    pub sync_packets_sent: u64,
    /// Timing replies sent on the timing channel
    pub timing_replies_sent: u64,
}

/// Counters shared by the send path and the background tasks
#[derive(Debug, Default)]
pub struct StatsCounters {
    frames_sent: AtomicU64,
    frames_dropped: AtomicU64,
    sync_packets_sent: AtomicU64,
    timing_replies_sent: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn frame_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn frames_dropped(&self, count: u64) {
        self.frames_dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn sync_sent(&self) {
        self.sync_packets_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn timing_reply_sent(&self) {
        self.timing_replies_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters
    #[must_use]
    pub fn snapshot(&self) -> SessionStats {
        SessionStats {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            sync_packets_sent: self.sync_packets_sent.load(Ordering::Relaxed),
            timing_replies_sent: self.timing_replies_sent.load(Ordering::Relaxed),
        }
    }
}
