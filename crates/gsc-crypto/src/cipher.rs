//! AES-128 block cipher for the pairing rounds.
//!
//! The handshake encrypts challenges and digests as independent 16-byte
//! blocks with no IV or chaining (ECB). Inputs must therefore be a whole
//! number of blocks.

use aes::cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::CryptoError;

pub const BLOCK_LEN: usize = 16;

/// A 128-bit AES key.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AesKey([u8; 16]);

impl AesKey {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl std::fmt::Debug for AesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AesKey(<redacted>)")
    }
}

/// Encrypt/decrypt schedules derived from one key. Wiped on drop.
pub struct BlockCipher {
    aes: Aes128,
}

impl BlockCipher {
    pub fn new(key: &AesKey) -> Self {
        Self {
            aes: Aes128::new(GenericArray::from_slice(key.as_bytes())),
        }
    }

    /// Encrypt `data` block by block.
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        check_blocks(data)?;
        let mut out = data.to_vec();
        for block in out.chunks_exact_mut(BLOCK_LEN) {
            self.aes.encrypt_block(GenericArray::from_mut_slice(block));
        }
        Ok(out)
    }

    /// Decrypt `data` block by block.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        check_blocks(data)?;
        let mut out = data.to_vec();
        for block in out.chunks_exact_mut(BLOCK_LEN) {
            self.aes.decrypt_block(GenericArray::from_mut_slice(block));
        }
        Ok(out)
    }
}

fn check_blocks(data: &[u8]) -> Result<(), CryptoError> {
    if data.len() % BLOCK_LEN != 0 {
        let expected = (data.len() / BLOCK_LEN + 1) * BLOCK_LEN;
        return Err(CryptoError::InvalidLength {
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}
