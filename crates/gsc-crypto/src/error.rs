//! Error type shared by every module of this crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    /// Input was not an even-length string of hex digits
    #[error("hex decode failed: {0}")]
    HexDecode(String),

    /// A buffer did not have the length the protocol requires
    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("RNG failed")]
    Rng,

    /// Certificate could not be parsed or generated
    #[error("certificate error: {0}")]
    Certificate(String),

    /// Private or public key could not be decoded or encoded
    #[error("key error: {0}")]
    Key(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<hex::FromHexError> for CryptoError {
    fn from(e: hex::FromHexError) -> Self {
        CryptoError::HexDecode(e.to_string())
    }
}
