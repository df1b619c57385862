//! GSC Crypto - primitives used by the GameStream pairing handshake.
//!
//! This crate implements:
//! - Hex encoding with strict decoding
//! - Digest selection by server generation (SHA-1 / SHA-256)
//! - AES-128 block encryption for the pairing rounds
//! - PIN + salt key derivation
//! - Client certificate loading, generation, signing and verification

#![forbid(unsafe_code)]

pub mod error;
pub mod encoding;
pub mod hash;
pub mod random;
pub mod cipher;
pub mod pairing;
pub mod cert;

#[cfg(test)]
mod proptests;

pub use error::CryptoError;
