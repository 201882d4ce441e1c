//! Test doubles for exercising a sender without real hardware

pub mod mock_raop_server;
#[cfg(test)]
mod tests;

pub use mock_raop_server::{
    MockRaopConfig, MockRaopServer, MockRaopState, MockServerError, RecordedRequest,
};

use crate::types::ReceiverInfo;

/// Receiver description pointing at a running mock
#[must_use]
pub fn mock_receiver(server: &MockRaopServer) -> ReceiverInfo {
    ReceiverInfo::new(server.config.name.clone(), "127.0.0.1", server.config.rtsp_port)
}
