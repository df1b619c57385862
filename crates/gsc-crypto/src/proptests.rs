//! Property-based tests for the pairing primitives.

use proptest::prelude::*;

use crate::cipher::{AesKey, BlockCipher};
use crate::encoding::{from_hex, to_hex};
use crate::hash::DigestAlgorithm;
use crate::pairing::derive_pairing_key;

fn pin_strategy() -> impl Strategy<Value = [u8; 4]> {
    prop::array::uniform4(b'0'..=b'9')
}

proptest! {
    #[test]
    fn prop_hex_roundtrip(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        prop_assert_eq!(from_hex(&to_hex(&bytes)).unwrap(), bytes);
    }

    #[test]
    fn prop_odd_length_hex_rejected(s in "[0-9a-f]{0,63}") {
        prop_assume!(s.len() % 2 == 1);
        prop_assert!(from_hex(&s).is_err());
    }

    #[test]
    fn prop_key_derivation_deterministic(
        salt in any::<[u8; 16]>(),
        pin in pin_strategy(),
        version in 0u32..12,
    ) {
        let alg = DigestAlgorithm::for_server_version(version);
        let a = derive_pairing_key(&salt, &pin, alg);
        let b = derive_pairing_key(&salt, &pin, alg);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_aes_blocks_roundtrip(
        key in any::<[u8; 16]>(),
        blocks in prop::collection::vec(any::<[u8; 16]>(), 1..4),
    ) {
        let cipher = BlockCipher::new(&AesKey::from_bytes(key));
        let data: Vec<u8> = blocks.concat();
        let ct = cipher.encrypt(&data).unwrap();
        prop_assert_eq!(cipher.decrypt(&ct).unwrap(), data);
    }
}
