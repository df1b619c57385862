use getrandom::getrandom;

use crate::CryptoError;

/// Fill a fixed-size array from the OS CSPRNG.
pub fn random_bytes<const N: usize>() -> Result<[u8; N], CryptoError> {
    let mut b = [0u8; N];
    getrandom(&mut b).map_err(|_| CryptoError::Rng)?;
    Ok(b)
}

pub fn random_u32() -> Result<u32, CryptoError> {
    Ok(u32::from_le_bytes(random_bytes::<4>()?))
}
