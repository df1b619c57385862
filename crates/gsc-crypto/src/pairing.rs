//! Key derivation and digests specific to the pairing handshake.

use crate::cipher::AesKey;
use crate::hash::DigestAlgorithm;

pub const SALT_LEN: usize = 16;
pub const PIN_LEN: usize = 4;

/// Derive the AES key shared with the host from the salt and PIN.
///
/// key = digest(salt || pin)[..16]
pub fn derive_pairing_key(
    salt: &[u8; SALT_LEN],
    pin: &[u8; PIN_LEN],
    algorithm: DigestAlgorithm,
) -> AesKey {
    let mut salted = [0u8; SALT_LEN + PIN_LEN];
    salted[..SALT_LEN].copy_from_slice(salt);
    salted[SALT_LEN..].copy_from_slice(pin);

    let mut digest = algorithm.digest_padded(&salted);
    let mut key = [0u8; 16];
    key.copy_from_slice(&digest[..16]);

    zeroize::Zeroize::zeroize(&mut digest);
    zeroize::Zeroize::zeroize(&mut salted);
    AesKey::from_bytes(key)
}

/// Digest proving knowledge of a challenge and binding it to a certificate.
///
/// digest(challenge || cert_signature || secret), zero-padded to 32 bytes.
/// Both sides of the handshake compute it: the client over the host's
/// challenge, the host over the client's.
pub fn challenge_digest(
    challenge: &[u8],
    cert_signature: &[u8],
    secret: &[u8],
    algorithm: DigestAlgorithm,
) -> [u8; 32] {
    let mut input = Vec::with_capacity(challenge.len() + cert_signature.len() + secret.len());
    input.extend_from_slice(challenge);
    input.extend_from_slice(cert_signature);
    input.extend_from_slice(secret);
    let out = algorithm.digest_padded(&input);
    zeroize::Zeroize::zeroize(&mut input);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn salt() -> [u8; 16] {
        let mut s = [0u8; 16];
        for (i, b) in s.iter_mut().enumerate() {
            *b = i as u8;
        }
        s
    }

    #[test]
    fn test_derive_sha256_vector() {
        let key = derive_pairing_key(&salt(), b"1234", DigestAlgorithm::Sha256);
        assert_eq!(hex::encode(key.as_bytes()), "bad0b4f7cae08eb7c1b5acc763a8ed25");
    }

    #[test]
    fn test_derive_sha1_vector() {
        let key = derive_pairing_key(&salt(), b"1234", DigestAlgorithm::Sha1);
        assert_eq!(hex::encode(key.as_bytes()), "0cd2f00b23437ed6adc97cd8f7dbf3ed");
    }

    #[test]
    fn test_pin_changes_key() {
        let a = derive_pairing_key(&salt(), b"1234", DigestAlgorithm::Sha256);
        let b = derive_pairing_key(&salt(), b"1235", DigestAlgorithm::Sha256);
        assert_ne!(a, b);
    }

    #[test]
    fn test_challenge_digest_sha1_is_padded() {
        let d = challenge_digest(&[1u8; 16], &[2u8; 256], &[3u8; 16], DigestAlgorithm::Sha1);
        assert_eq!(&d[20..], &[0u8; 12]);
    }

    #[test]
    fn test_challenge_digest_is_concatenation() {
        let mut whole = vec![1u8; 16];
        whole.extend_from_slice(&[2u8; 256]);
        whole.extend_from_slice(&[3u8; 16]);
        let d = challenge_digest(&[1u8; 16], &[2u8; 256], &[3u8; 16], DigestAlgorithm::Sha256);
        assert_eq!(d, crate::hash::sha256(&whole));
    }
}
