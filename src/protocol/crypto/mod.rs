//! Cryptographic primitives for RAOP pairing
//!
//! - SRP-6a client (and a server half used by the test receiver) over the
//!   2048-bit Apple group with SHA-512
//! - X25519 key agreement for `/auth-setup`
//! - HKDF-SHA512 and AES-GCM helpers for deriving and using keys downstream
//!
//! All of it hangs off a [`CryptoContext`] that callers construct once and
//! pass to whatever needs it.

mod aes;
mod context;
mod error;
mod hkdf;
mod srp;
mod x25519;

pub use self::aes::AesGcm;
pub use self::context::CryptoContext;
pub use self::error::CryptoError;
pub use self::hkdf::{HkdfSha512, StreamKeys, derive_key};
pub use self::srp::{SessionKey, SrpClient, SrpGroup, SrpProof, SrpServer};
pub use self::x25519::{X25519KeyPair, X25519PublicKey, X25519SharedSecret};

/// Length of various cryptographic values
pub mod lengths {
    /// X25519 public key length
    pub const X25519_PUBLIC_KEY: usize = 32;
    /// X25519 shared secret length
    pub const X25519_SHARED_SECRET: usize = 32;
    /// SHA-512 digest length (SRP proofs and session key)
    pub const SHA512_DIGEST: usize = 64;
    /// SRP group modulus length in bytes
    pub const SRP_MODULUS: usize = 256;
    /// AES-128 key length
    pub const AES_128_KEY: usize = 16;
    /// AES-256 key length
    pub const AES_256_KEY: usize = 32;
    /// AES-GCM nonce length
    pub const AES_GCM_NONCE: usize = 12;
}
