//! Hex encoding as used on the wire.
//!
//! Every binary field of the pairing protocol (salt, certificates, challenges,
//! secrets) travels as lowercase hex in a query string or XML element.
//! Decoding is strict: odd lengths and non-hex digits are errors, never a
//! silently truncated buffer.

use crate::CryptoError;

/// Encode bytes as lowercase hex.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode a hex string into bytes.
///
/// Surrounding whitespace is ignored because some hosts pretty-print their
/// XML bodies.
pub fn from_hex(s: &str) -> Result<Vec<u8>, CryptoError> {
    Ok(hex::decode(s.trim())?)
}

/// Decode a hex string that must describe exactly `N` bytes.
pub fn from_hex_array<const N: usize>(s: &str) -> Result<[u8; N], CryptoError> {
    let bytes = from_hex(s)?;
    let actual = bytes.len();
    bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidLength { expected: N, actual })
}
