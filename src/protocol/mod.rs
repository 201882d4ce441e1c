//! RAOP wire protocols: RTSP control, RTP transport, SDP, pairing crypto

#![allow(missing_docs)]

pub mod crypto;
pub mod pairing;
pub mod rtp;
pub mod rtsp;
pub mod sdp;
