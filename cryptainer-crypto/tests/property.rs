//! Property tests over `symmetric_cipher` (SPEC_FULL.md §8: "decrypt(encrypt(P, C)) == P
//! for every valid C, including empty P"). A property test over arbitrary
//! plaintexts and algos is the kind of check that would have caught a
//! verification pass that didn't actually bind to the ciphertext bytes.

use cryptainer_crypto::{symmetric_cipher, PayloadCipherAlgo};
use proptest::prelude::*;

fn any_symmetric_algo() -> impl Strategy<Value = PayloadCipherAlgo> {
    prop_oneof![
        Just(PayloadCipherAlgo::AesCbc),
        Just(PayloadCipherAlgo::AesEax),
        Just(PayloadCipherAlgo::Chacha20Poly1305),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn roundtrips_arbitrary_plaintext(
        plaintext in proptest::collection::vec(any::<u8>(), 0..2048),
        algo in any_symmetric_algo(),
    ) {
        let key = symmetric_cipher::generate_key(algo).unwrap();
        let ct = symmetric_cipher::encrypt(algo, &key, &plaintext).unwrap();
        let pt = symmetric_cipher::decrypt(algo, &key, &ct, true).unwrap();
        prop_assert_eq!(pt, plaintext);
    }

    #[test]
    fn flipping_any_ciphertext_byte_changes_the_recovered_plaintext(
        plaintext in proptest::collection::vec(any::<u8>(), 1..256),
        byte_index in 0usize..4096,
        algo in any_symmetric_algo(),
    ) {
        let key = symmetric_cipher::generate_key(algo).unwrap();
        let mut ct = symmetric_cipher::encrypt(algo, &key, &plaintext).unwrap();
        let idx = byte_index % ct.ciphertext.len();
        ct.ciphertext[idx] ^= 0xFF;

        // Unauthenticated AES_CBC still "decrypts" (no MAC to reject it), but
        // the recovered bytes must differ from the original plaintext.
        // Authenticated algos reject outright when verified.
        if algo.is_authenticated() {
            prop_assert!(symmetric_cipher::decrypt(algo, &key, &ct, true).is_err());
        } else if let Ok(recovered) = symmetric_cipher::decrypt(algo, &key, &ct, true) {
            prop_assert_ne!(recovered, plaintext);
        }
    }

    #[test]
    fn authenticated_algos_reject_any_single_tag_byte_flip(
        plaintext in proptest::collection::vec(any::<u8>(), 0..256),
        byte_index in 0usize..32,
        algo in prop_oneof![Just(PayloadCipherAlgo::AesEax), Just(PayloadCipherAlgo::Chacha20Poly1305)],
    ) {
        let key = symmetric_cipher::generate_key(algo).unwrap();
        let mut ct = symmetric_cipher::encrypt(algo, &key, &plaintext).unwrap();
        let tag = ct.macs.get_mut("tag").unwrap();
        let idx = byte_index % tag.len();
        tag[idx] ^= 0xFF;

        prop_assert!(symmetric_cipher::decrypt(algo, &key, &ct, true).is_err());
        // Without verification the same (tampered-tag) ciphertext still recovers cleanly.
        prop_assert_eq!(symmetric_cipher::decrypt(algo, &key, &ct, false).unwrap(), plaintext);
    }
}
