//! # raop-stream
//!
//! A pure Rust client for streaming live audio to RAOP (`AirPlay` 1)
//! receivers.
//!
//! ## Features
//!
//! - RTSP handshake with optional SRP PIN pairing
//! - Realtime ALAC framing over RTP/UDP
//! - Timing replies and periodic sync packets
//! - Bounded capture queue with configurable backpressure
//! - Receiver discovery via mDNS (`discovery` feature)
//!
//! ## Example
//!
//! ```rust,no_run
//! use raop_stream::prelude::*;
//!
//! # async fn example() -> Result<(), RaopError> {
//! let receiver = ReceiverInfo::new("Living Room", "192.168.1.30", 5000);
//! let config = RaopConfig::builder().pin("1234").build();
//! let mut session = RaopSession::new(receiver, config, CryptoContext::new()?);
//!
//! session.connect().await?;
//! session.set_volume(0.8).await?;
//!
//! let queue = CaptureQueue::new(64, BackpressurePolicy::DropOldest);
//! // A capture thread pushes 1408-byte PCM chunks into `queue`...
//! pump(&mut session, &queue).await?;
//!
//! session.stop().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Session**: [`RaopSession`] owns the handshake, the sockets and the
//!   state machine
//! - **Streaming**: packetizing, sync and the capture queue
//! - **Protocol**: RTSP, SDP, RTP, pairing and crypto primitives

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Error types
pub mod error;
/// Core types
pub mod types;

/// Testing utilities
pub mod testing;

pub mod audio;
#[cfg(feature = "discovery")]
pub mod discovery;
pub mod net;
pub mod protocol;
pub mod session;
/// Streaming support
pub mod streaming;

pub use audio::AudioFrame;
#[cfg(feature = "discovery")]
pub use discovery::{DiscoveryEvent, browse, scan};
pub use error::{RaopError, Result};
pub use protocol::crypto::CryptoContext;
pub use protocol::pairing::{PinProvider, StaticPin};
pub use session::{
    LocalPorts, RaopSession, ReceiverDetails, ServerEndpoints, SessionIds, SessionState,
    volume_to_db,
};
pub use streaming::{CaptureQueue, SessionStats, pump};
pub use types::{BackpressurePolicy, RaopConfig, RaopConfigBuilder, ReceiverInfo};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
pub mod prelude {
    pub use crate::{
        BackpressurePolicy, CaptureQueue, CryptoContext, RaopConfig, RaopError, RaopSession,
        ReceiverInfo, SessionState, pump, volume_to_db,
    };
}
