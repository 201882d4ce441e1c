//! Audio streaming
//!
//! RTP packetization, the control/timing background tasks, per-session
//! counters and the capture handoff queue.

mod capture;
mod raop_streamer;
mod stats;
pub mod sync_engine;

#[cfg(test)]
mod tests;

pub use capture::{CaptureQueue, pump};
pub use raop_streamer::RaopStreamer;
pub use stats::{SessionStats, StatsCounters};
pub use sync_engine::{Channel, SyncSender, TimingSyncEngine};
