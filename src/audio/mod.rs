//! Audio framing for the RAOP stream

pub mod alac;
pub mod frame;

pub use alac::{AlacFrameEncoder, BitWriter};
pub use frame::AudioFrame;
