//! CryptainerDecryptor (component E, SPEC_FULL.md §4.E): inverse of the
//! encryptor — unwraps symkeys (reconstituting Shamir shards when needed),
//! decrypts payload layers, and optionally verifies signatures/MACs.

use serde::{Deserialize, Serialize};

use cryptainer_crypto::{digests, signature_suite, symmetric_cipher, asymmetric_cipher, secret_sharing};
use cryptainer_keystore::KeychainUid;

use crate::cryptoconf::{Cryptainer, KeyCipherLayer, PayloadCipherLayer};
use crate::error::CryptainerError;
use crate::passphrase::PassphraseMapper;
use crate::registry::TrusteeRegistry;

#[derive(Serialize, Deserialize)]
struct SharedSecretCiphertext {
    shard_ciphertexts: Vec<Vec<u8>>,
}

fn effective_keychain_uid(default_kuid: KeychainUid, layer_override: Option<KeychainUid>) -> KeychainUid {
    layer_override.unwrap_or(default_kuid)
}

pub struct CryptainerDecryptor<'a> {
    registry: &'a TrusteeRegistry,
}

impl<'a> CryptainerDecryptor<'a> {
    pub fn new(registry: &'a TrusteeRegistry) -> Self {
        Self { registry }
    }

    /// Decrypt `cryptainer`, returning the original plaintext bytes (§4.E).
    pub async fn decrypt(
        &self,
        cryptainer: &Cryptainer,
        passphrase_mapper: &PassphraseMapper,
        verify: bool,
    ) -> Result<Vec<u8>, CryptainerError> {
        if !cryptainer.is_current_format() {
            return Err(CryptainerError::ValueError("Unknown cryptainer format".to_string()));
        }

        let ciphertext_value = match &cryptainer.payload_ciphertext_struct {
            crate::cryptoconf::PayloadCiphertextStruct::Inline { ciphertext_value } => ciphertext_value.clone(),
            crate::cryptoconf::PayloadCiphertextStruct::Offloaded(_) => {
                return Err(CryptainerError::ConfigurationError(
                    "cryptainer payload ciphertext is offloaded; load it before decrypting".to_string(),
                ))
            }
        };

        // Unwrap symkeys innermost-last means: reverse the layer order since
        // layers were applied innermost-first during encryption, so the
        // outermost (last-applied) layer must be peeled off first. Signature
        // verification is interleaved into this same peel loop: at the top
        // of each iteration `ciphertext` holds exactly the bytes that
        // layer's encryption produced, so the digest can be recomputed over
        // the real payload instead of trusting the stored digest value.
        let mut ciphertext = ciphertext_value;
        for layer in cryptainer.payload_cipher_layers.iter().rev() {
            if verify {
                self.verify_layer_signatures(layer, &ciphertext, cryptainer.keychain_uid).await?;
            }

            let key_ciphertext = layer
                .key_ciphertext
                .as_ref()
                .ok_or_else(|| CryptainerError::ConfigurationError("layer missing key_ciphertext".to_string()))?;

            let symkey = self
                .unwrap_key_material(&layer.key_cipher_layers, key_ciphertext, cryptainer.keychain_uid, passphrase_mapper)
                .await?;

            let payload_macs = layer.payload_macs.clone().unwrap_or_default();
            let symmetric_ct = symmetric_cipher::SymmetricCiphertext {
                ciphertext,
                macs: payload_macs.into_iter().collect(),
            };
            ciphertext = symmetric_cipher::decrypt(layer.payload_cipher_algo, &symkey, &symmetric_ct, verify)
                .map_err(|_| CryptainerError::DecryptionIntegrityError("payload MAC verification failed".to_string()))?;
        }

        Ok(ciphertext)
    }

    /// Recompute each signature's digest over `ciphertext` (the layer's
    /// actual encrypted bytes, not the stored digest value) and reject if it
    /// doesn't match what was signed, then verify the signature over the
    /// recomputed digest. Mirrors the original wacryptolib's
    /// recompute-then-compare-then-verify sequence (§4.E step 2) so a
    /// tampered ciphertext is caught even under an unauthenticated cipher.
    async fn verify_layer_signatures(
        &self,
        layer: &PayloadCipherLayer,
        ciphertext: &[u8],
        default_keychain_uid: KeychainUid,
    ) -> Result<(), CryptainerError> {
        for sig in &layer.payload_signatures {
            let trustee = self.registry.resolve(&sig.payload_signature_trustee)?;
            let kuid = effective_keychain_uid(default_keychain_uid, sig.keychain_uid);
            let key_algo = cryptainer_keystore::KeyAlgo::from(sig.payload_signature_algo);
            let public_key = trustee.fetch_public_key(kuid, key_algo, true).await?;

            let stored_digest = sig
                .payload_digest_value
                .as_ref()
                .ok_or_else(|| CryptainerError::DecryptionIntegrityError("signature missing digest value".to_string()))?;
            let signature_value = sig
                .signature_value
                .as_ref()
                .ok_or_else(|| CryptainerError::DecryptionIntegrityError("signature missing signature value".to_string()))?;

            let recomputed_digest = digests::digest(sig.payload_digest_algo, ciphertext);
            if &recomputed_digest != stored_digest {
                return Err(CryptainerError::DecryptionIntegrityError(
                    "recomputed payload digest does not match stored digest value".to_string(),
                ));
            }

            signature_suite::verify(&public_key, &recomputed_digest, signature_value)
                .map_err(|_| CryptainerError::DecryptionIntegrityError("payload signature verification failed".to_string()))?;
        }
        Ok(())
    }

    /// Reverse `wrap_key_material`: unwrap `key_ciphertext` back through
    /// `key_cipher_layers` in reverse order (§4.E step 3).
    #[async_recursion::async_recursion]
    async fn unwrap_key_material(
        &self,
        key_cipher_layers: &[KeyCipherLayer],
        key_ciphertext: &[u8],
        default_keychain_uid: KeychainUid,
        passphrase_mapper: &PassphraseMapper,
    ) -> Result<Vec<u8>, CryptainerError> {
        let mut bytes = key_ciphertext.to_vec();
        for layer in key_cipher_layers.iter().rev() {
            bytes = self.unwrap_one_key_layer(layer, &bytes, default_keychain_uid, passphrase_mapper).await?;
        }
        Ok(bytes)
    }

    #[async_recursion::async_recursion]
    async fn unwrap_one_key_layer(
        &self,
        layer: &KeyCipherLayer,
        bytes: &[u8],
        default_keychain_uid: KeychainUid,
        passphrase_mapper: &PassphraseMapper,
    ) -> Result<Vec<u8>, CryptainerError> {
        match layer {
            KeyCipherLayer::PlainWrap { key_cipher_algo, key_cipher_trustee, keychain_uid } => {
                let trustee = self.registry.resolve(key_cipher_trustee)?;
                let kuid = effective_keychain_uid(default_keychain_uid, *keychain_uid);
                let passphrases = passphrase_mapper.passphrases_for(key_cipher_trustee);
                trustee
                    .decrypt_with_private_key(kuid, *key_cipher_algo, &bytes.to_vec(), &passphrases)
                    .await
            }
            KeyCipherLayer::SharedSecret { key_shared_secret_threshold, key_shared_secret_shards } => {
                let parsed: SharedSecretCiphertext = serde_json::from_slice(bytes)?;
                let threshold = *key_shared_secret_threshold as usize;

                let mut valid_shards = Vec::with_capacity(parsed.shard_ciphertexts.len());
                for (shard_ciphertext, shard_layers) in
                    parsed.shard_ciphertexts.iter().zip(key_shared_secret_shards.iter())
                {
                    match self
                        .unwrap_key_material(shard_layers, shard_ciphertext, default_keychain_uid, passphrase_mapper)
                        .await
                    {
                        Ok(shard_bytes) => valid_shards.push(shard_bytes),
                        Err(_) => continue,
                    }
                }

                if valid_shards.len() < threshold {
                    let missing = threshold - valid_shards.len();
                    return Err(CryptainerError::DecryptionError(format!(
                        "{} valid shards missing for reconstitution",
                        missing
                    )));
                }

                secret_sharing::recover(*key_shared_secret_threshold, &valid_shards)
                    .map_err(|_| CryptainerError::DecryptionError("shared secret reconstitution failed".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cryptoconf::Cryptoconf;
    use crate::encryptor::CryptainerEncryptor;
    use crate::trustee_id::TrusteeDescriptor;
    use cryptainer_crypto::{AsymmetricCipherAlgo, DigestAlgo, PayloadCipherAlgo, SignatureAlgo};
    use cryptainer_keystore::{InMemoryBackend, Keystore, KeystorePool};
    use std::sync::Arc;

    fn registry() -> TrusteeRegistry {
        let factory = Arc::new(Keystore::new(Arc::new(InMemoryBackend::new())));
        TrusteeRegistry::new(Arc::new(KeystorePool::new(factory)))
    }

    fn plain_wrap() -> KeyCipherLayer {
        KeyCipherLayer::PlainWrap {
            key_cipher_algo: AsymmetricCipherAlgo::RsaOaep,
            key_cipher_trustee: TrusteeDescriptor::LocalFactory,
            keychain_uid: None,
        }
    }

    #[tokio::test]
    async fn roundtrips_simple_cryptoconf() {
        let registry = registry();
        let cryptoconf = Cryptoconf::new(vec![PayloadCipherLayer {
            payload_cipher_algo: PayloadCipherAlgo::AesCbc,
            key_cipher_layers: vec![plain_wrap()],
            payload_signatures: vec![crate::cryptoconf::PayloadSignature {
                payload_digest_algo: DigestAlgo::Sha256,
                payload_signature_algo: SignatureAlgo::DsaDss,
                payload_signature_trustee: TrusteeDescriptor::LocalFactory,
                keychain_uid: None,
                signature_value: None,
                payload_digest_value: None,
            }],
            key_ciphertext: None,
            payload_macs: None,
        }]);

        let cryptainer = CryptainerEncryptor::new(&registry).encrypt(&cryptoconf, b"abc", None, None).await.unwrap();

        let mapper = PassphraseMapper::new();
        let plaintext = CryptainerDecryptor::new(&registry).decrypt(&cryptainer, &mapper, true).await.unwrap();
        assert_eq!(plaintext, b"abc");
    }

    #[tokio::test]
    async fn tampered_ciphertext_of_unauthenticated_signed_layer_fails_verify() {
        let registry = registry();
        let cryptoconf = Cryptoconf::new(vec![PayloadCipherLayer {
            payload_cipher_algo: PayloadCipherAlgo::AesCbc,
            key_cipher_layers: vec![plain_wrap()],
            payload_signatures: vec![crate::cryptoconf::PayloadSignature {
                payload_digest_algo: DigestAlgo::Sha256,
                payload_signature_algo: SignatureAlgo::DsaDss,
                payload_signature_trustee: TrusteeDescriptor::LocalFactory,
                keychain_uid: None,
                signature_value: None,
                payload_digest_value: None,
            }],
            key_ciphertext: None,
            payload_macs: None,
        }]);
        let mut cryptainer = CryptainerEncryptor::new(&registry).encrypt(&cryptoconf, b"abc", None, None).await.unwrap();

        match &mut cryptainer.payload_ciphertext_struct {
            crate::cryptoconf::PayloadCiphertextStruct::Inline { ciphertext_value } => {
                ciphertext_value[0] ^= 0xFF;
            }
            crate::cryptoconf::PayloadCiphertextStruct::Offloaded(_) => panic!("expected inline ciphertext"),
        }

        let mapper = PassphraseMapper::new();
        // AES_CBC carries no MAC, so without verification the tamper goes unnoticed.
        assert!(CryptainerDecryptor::new(&registry).decrypt(&cryptainer, &mapper, false).await.is_ok());

        let err = CryptainerDecryptor::new(&registry).decrypt(&cryptainer, &mapper, true).await.unwrap_err();
        assert!(matches!(err, CryptainerError::DecryptionIntegrityError(_)));
    }

    #[tokio::test]
    async fn unknown_format_is_rejected() {
        let registry = registry();
        let cryptoconf = Cryptoconf::new(vec![PayloadCipherLayer {
            payload_cipher_algo: PayloadCipherAlgo::AesCbc,
            key_cipher_layers: vec![plain_wrap()],
            payload_signatures: vec![],
            key_ciphertext: None,
            payload_macs: None,
        }]);
        let mut cryptainer = CryptainerEncryptor::new(&registry).encrypt(&cryptoconf, b"abc", None, None).await.unwrap();
        cryptainer.cryptainer_format = "OAJKB".to_string();

        let mapper = PassphraseMapper::new();
        let err = CryptainerDecryptor::new(&registry).decrypt(&cryptainer, &mapper, false).await.unwrap_err();
        assert!(matches!(err, CryptainerError::ValueError(msg) if msg == "Unknown cryptainer format"));
    }

    #[tokio::test]
    async fn shamir_tolerates_missing_shards_up_to_threshold() {
        let registry = registry();
        let shard = vec![plain_wrap()];
        let cryptoconf = Cryptoconf::new(vec![PayloadCipherLayer {
            payload_cipher_algo: PayloadCipherAlgo::AesCbc,
            key_cipher_layers: vec![KeyCipherLayer::SharedSecret {
                key_shared_secret_threshold: 3,
                key_shared_secret_shards: vec![shard.clone(), shard.clone(), shard.clone(), shard.clone(), shard],
            }],
            payload_signatures: vec![],
            key_ciphertext: None,
            payload_macs: None,
        }]);

        let cryptainer = CryptainerEncryptor::new(&registry).encrypt(&cryptoconf, b"abc", None, None).await.unwrap();
        let mapper = PassphraseMapper::new();

        // All shards present.
        let pt = CryptainerDecryptor::new(&registry).decrypt(&cryptainer, &mapper, false).await.unwrap();
        assert_eq!(pt, b"abc");

        // Corrupt two shards (still >= threshold valid).
        let mut two_missing = cryptainer.clone();
        {
            let key_ciphertext = two_missing.payload_cipher_layers[0].key_ciphertext.as_ref().unwrap();
            let mut parsed: SharedSecretCiphertext = serde_json::from_slice(key_ciphertext).unwrap();
            parsed.shard_ciphertexts[0] = vec![0u8; 4];
            parsed.shard_ciphertexts[1] = vec![0u8; 4];
            two_missing.payload_cipher_layers[0].key_ciphertext = Some(serde_json::to_vec(&parsed).unwrap());
        }
        let pt = CryptainerDecryptor::new(&registry).decrypt(&two_missing, &mapper, false).await.unwrap();
        assert_eq!(pt, b"abc");

        // Corrupt three shards (below threshold).
        let mut three_missing = cryptainer;
        {
            let key_ciphertext = three_missing.payload_cipher_layers[0].key_ciphertext.as_ref().unwrap();
            let mut parsed: SharedSecretCiphertext = serde_json::from_slice(key_ciphertext).unwrap();
            parsed.shard_ciphertexts[0] = vec![0u8; 4];
            parsed.shard_ciphertexts[1] = vec![0u8; 4];
            parsed.shard_ciphertexts[2] = vec![0u8; 4];
            three_missing.payload_cipher_layers[0].key_ciphertext = Some(serde_json::to_vec(&parsed).unwrap());
        }
        let err = CryptainerDecryptor::new(&registry).decrypt(&three_missing, &mapper, false).await.unwrap_err();
        match err {
            CryptainerError::DecryptionError(msg) => assert!(msg.contains("missing")),
            other => panic!("expected DecryptionError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn integrity_verify_detects_tampered_mac() {
        let registry = registry();
        let cryptoconf = Cryptoconf::new(vec![PayloadCipherLayer {
            payload_cipher_algo: PayloadCipherAlgo::AesEax,
            key_cipher_layers: vec![plain_wrap()],
            payload_signatures: vec![],
            key_ciphertext: None,
            payload_macs: None,
        }]);
        let mut cryptainer = CryptainerEncryptor::new(&registry).encrypt(&cryptoconf, b"abc", None, None).await.unwrap();
        let tag = cryptainer.payload_cipher_layers[0].payload_macs.as_mut().unwrap().get_mut("tag").unwrap();
        tag[0] ^= 0xFF;

        let mapper = PassphraseMapper::new();
        let pt = CryptainerDecryptor::new(&registry).decrypt(&cryptainer, &mapper, false).await.unwrap();
        assert_eq!(pt, b"abc");

        let err = CryptainerDecryptor::new(&registry).decrypt(&cryptainer, &mapper, true).await.unwrap_err();
        assert!(matches!(err, CryptainerError::DecryptionIntegrityError(_)));
    }
}
