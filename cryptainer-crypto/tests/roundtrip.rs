use cryptainer_crypto::{asymmetric_cipher, symmetric_cipher, AsymmetricCipherAlgo, PayloadCipherAlgo};

#[test]
fn asymmetric_roundtrip_basic() {
    let (pk, sk) = asymmetric_cipher::generate_keypair(AsymmetricCipherAlgo::RsaOaep);
    let plaintext = b"a symmetric key worth wrapping..";
    let ct = asymmetric_cipher::wrap(AsymmetricCipherAlgo::RsaOaep, &pk, plaintext).unwrap();
    let pt = asymmetric_cipher::unwrap(AsymmetricCipherAlgo::RsaOaep, &sk, &ct).unwrap();
    assert_eq!(&pt, plaintext);
}

#[test]
fn asymmetric_empty_plaintext_roundtrips() {
    let (pk, sk) = asymmetric_cipher::generate_keypair(AsymmetricCipherAlgo::RsaOaep);
    let ct = asymmetric_cipher::wrap(AsymmetricCipherAlgo::RsaOaep, &pk, b"").unwrap();
    let pt = asymmetric_cipher::unwrap(AsymmetricCipherAlgo::RsaOaep, &sk, &ct).unwrap();
    assert_eq!(pt, b"");
}

#[test]
fn asymmetric_wrong_key_fails() {
    let (pk, _sk) = asymmetric_cipher::generate_keypair(AsymmetricCipherAlgo::RsaOaep);
    let (_pk2, sk2) = asymmetric_cipher::generate_keypair(AsymmetricCipherAlgo::RsaOaep);
    let ct = asymmetric_cipher::wrap(AsymmetricCipherAlgo::RsaOaep, &pk, b"data").unwrap();
    assert!(asymmetric_cipher::unwrap(AsymmetricCipherAlgo::RsaOaep, &sk2, &ct).is_err());
}

#[test]
fn asymmetric_truncated_ciphertext_fails() {
    let (pk, sk) = asymmetric_cipher::generate_keypair(AsymmetricCipherAlgo::RsaOaep);
    let ct = asymmetric_cipher::wrap(AsymmetricCipherAlgo::RsaOaep, &pk, b"data").unwrap();
    assert!(asymmetric_cipher::unwrap(AsymmetricCipherAlgo::RsaOaep, &sk, &ct[..10]).is_err());
}

#[test]
fn asymmetric_tampered_ciphertext_fails() {
    let (pk, sk) = asymmetric_cipher::generate_keypair(AsymmetricCipherAlgo::RsaOaep);
    let mut ct = asymmetric_cipher::wrap(AsymmetricCipherAlgo::RsaOaep, &pk, b"data").unwrap();
    let last = ct.len() - 1;
    ct[last] ^= 0x01;
    assert!(asymmetric_cipher::unwrap(AsymmetricCipherAlgo::RsaOaep, &sk, &ct).is_err());
}

#[test]
fn symmetric_roundtrips_all_algos() {
    for algo in [
        PayloadCipherAlgo::AesCbc,
        PayloadCipherAlgo::AesEax,
        PayloadCipherAlgo::Chacha20Poly1305,
    ] {
        let key = symmetric_cipher::generate_key(algo).unwrap();
        let plaintext = vec![0xABu8; 4096];
        let ct = symmetric_cipher::encrypt(algo, &key, &plaintext).unwrap();
        let pt = symmetric_cipher::decrypt(algo, &key, &ct, true).unwrap();
        assert_eq!(pt, plaintext);
        assert_eq!(algo.is_authenticated(), !ct.macs.is_empty());
    }
}

#[test]
fn symmetric_wrong_key_fails() {
    for algo in [PayloadCipherAlgo::AesCbc, PayloadCipherAlgo::AesEax] {
        let key = symmetric_cipher::generate_key(algo).unwrap();
        let other_key = symmetric_cipher::generate_key(algo).unwrap();
        let ct = symmetric_cipher::encrypt(algo, &key, b"top secret").unwrap();
        // AES_CBC has no MAC: a wrong key still "decrypts" to garbage bytes
        // that happen to fail PKCS#7 unpadding almost always, but is not
        // guaranteed to; only the authenticated algos guarantee rejection.
        if algo.is_authenticated() {
            assert!(symmetric_cipher::decrypt(algo, &other_key, &ct, true).is_err());
        }
    }
}
