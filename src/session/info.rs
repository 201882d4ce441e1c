//! Receiver self-description from `GET /info`

use serde::Deserialize;

use crate::error::RaopError;
use crate::protocol::rtsp::RtspResponse;

/// Fields of the `/info` binary plist that a sender cares about
///
/// Every field is optional; receivers differ widely in what they report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReceiverDetails {
    /// Friendly name
    pub name: Option<String>,
    /// Hardware model, e.g. `AirPort10,115`
    pub model: Option<String>,
    /// Firmware version
    #[serde(rename = "sourceVersion")]
    pub source_version: Option<String>,
    /// Device id, usually the MAC address
    #[serde(rename = "deviceID")]
    pub device_id: Option<String>,
    /// MAC address
    #[serde(rename = "macAddress")]
    pub mac_address: Option<String>,
    /// Feature bitmask
    pub features: Option<u64>,
    /// Status flags
    #[serde(rename = "statusFlags")]
    pub status_flags: Option<u32>,
}

impl ReceiverDetails {
    /// Decode a binary or XML plist body
    ///
    /// # Errors
    /// Returns `HandshakeFailed` for `GET` when the status is not a success
    /// or the body is not a plist dictionary.
    pub fn from_response(response: &RtspResponse) -> Result<Self, RaopError> {
        let failed = || RaopError::HandshakeFailed {
            method: "GET".to_string(),
            status: response.status.as_u16(),
        };
        if !response.is_success() {
            return Err(failed());
        }
        plist::from_bytes(&response.body).map_err(|e| {
            tracing::debug!(error = %e, "unreadable /info body");
            failed()
        })
    }
}
