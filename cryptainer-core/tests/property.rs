//! Property test over the full encryptor/decryptor pipeline (SPEC_FULL.md
//! §8: "decrypt(encrypt(P, C)) == P for every valid C, including empty P").
//! Runs the async pipeline from a sync proptest body via a throwaway tokio
//! runtime, the standard way to property-test async code.

use std::sync::Arc;

use cryptainer_core::{
    CryptainerDecryptor, CryptainerEncryptor, Cryptoconf, KeyCipherLayer, PassphraseMapper,
    PayloadCipherLayer, TrusteeDescriptor, TrusteeRegistry,
};
use cryptainer_crypto::{AsymmetricCipherAlgo, PayloadCipherAlgo};
use cryptainer_keystore::{InMemoryBackend, Keystore, KeystorePool};
use proptest::prelude::*;

fn registry() -> TrusteeRegistry {
    let factory = Arc::new(Keystore::new(Arc::new(InMemoryBackend::new())));
    TrusteeRegistry::new(Arc::new(KeystorePool::new(factory)))
}

fn single_layer_cryptoconf(algo: PayloadCipherAlgo) -> Cryptoconf {
    Cryptoconf::new(vec![PayloadCipherLayer {
        payload_cipher_algo: algo,
        key_cipher_layers: vec![KeyCipherLayer::PlainWrap {
            key_cipher_algo: AsymmetricCipherAlgo::RsaOaep,
            key_cipher_trustee: TrusteeDescriptor::LocalFactory,
            keychain_uid: None,
        }],
        payload_signatures: vec![],
        key_ciphertext: None,
        payload_macs: None,
    }])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn encrypt_then_decrypt_recovers_arbitrary_payloads(
        plaintext in proptest::collection::vec(any::<u8>(), 0..1024),
        algo in prop_oneof![
            Just(PayloadCipherAlgo::AesCbc),
            Just(PayloadCipherAlgo::AesEax),
            Just(PayloadCipherAlgo::Chacha20Poly1305),
        ],
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let registry = registry();
        let cryptoconf = single_layer_cryptoconf(algo);

        let cryptainer = runtime
            .block_on(CryptainerEncryptor::new(&registry).encrypt(&cryptoconf, &plaintext, None, None))
            .unwrap();

        let mapper = PassphraseMapper::new();
        let recovered = runtime
            .block_on(CryptainerDecryptor::new(&registry).decrypt(&cryptainer, &mapper, true))
            .unwrap();

        prop_assert_eq!(recovered, plaintext);
    }
}
