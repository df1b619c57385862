use sha1::Sha1;
use sha2::{Digest, Sha256};

/// First server generation whose pairing rounds hash with SHA-256.
pub const SHA256_MIN_SERVER_VERSION: u32 = 7;

pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(data);
    let out = h.finalize();
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&out);
    arr
}

pub fn sha1(data: &[u8]) -> [u8; 20] {
    let mut h = Sha1::new();
    h.update(data);
    let out = h.finalize();
    let mut arr = [0u8; 20];
    arr.copy_from_slice(&out);
    arr
}

/// Digest used for key derivation and the challenge hash of one pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha1,
    Sha256,
}

impl DigestAlgorithm {
    /// Select the digest by the server's major protocol version.
    pub fn for_server_version(major: u32) -> Self {
        if major >= SHA256_MIN_SERVER_VERSION {
            DigestAlgorithm::Sha256
        } else {
            DigestAlgorithm::Sha1
        }
    }

    /// Digest length in bytes (the `hash_length` of the handshake).
    pub fn output_len(self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha256 => 32,
        }
    }

    /// Digest `data`, zero-padded to 32 bytes.
    ///
    /// The handshake always encrypts two AES blocks of digest, so SHA-1 output
    /// is padded; `output_len` tells how many leading bytes are meaningful.
    pub fn digest_padded(self, data: &[u8]) -> [u8; 32] {
        match self {
            DigestAlgorithm::Sha256 => sha256(data),
            DigestAlgorithm::Sha1 => {
                let mut out = [0u8; 32];
                out[..20].copy_from_slice(&sha1(data));
                out
            }
        }
    }
}
