//! Core types shared across the crate

mod config;
mod receiver;

#[cfg(test)]
mod tests;

pub use config::{BackpressurePolicy, DEFAULT_USER_AGENT, RaopConfig, RaopConfigBuilder};
pub use receiver::ReceiverInfo;
