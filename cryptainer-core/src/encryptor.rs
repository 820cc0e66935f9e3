//! CryptainerEncryptor (component D, SPEC_FULL.md §4.D): builds a finished
//! cryptainer from a cryptoconf and a plaintext payload.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cryptainer_crypto::{digests, signature_suite, symmetric_cipher, asymmetric_cipher, secret_sharing};
use cryptainer_keystore::KeychainUid;

use crate::cryptoconf::{
    Cryptainer, CryptainerState, Cryptoconf, KeyCipherLayer, PayloadCipherLayer,
    PayloadCiphertextStruct, PayloadSignature,
};
use crate::error::CryptainerError;
use crate::registry::TrusteeRegistry;

/// Serialized form of a shared-secret node's `key_ciphertext`: the set of
/// per-shard blobs, each itself the fully-wrapped bytes of that shard.
#[derive(Serialize, Deserialize)]
struct SharedSecretCiphertext {
    shard_ciphertexts: Vec<Vec<u8>>,
}

/// Whether `cryptoconf` supports the streaming encryption variant: no layer
/// may carry a payload signature (a post-hoc operation needing the finished
/// digest) to remain chunk-appendable (§4.D, §9).
pub fn is_cryptainer_cryptoconf_streamable(cryptoconf: &Cryptoconf) -> bool {
    cryptoconf
        .payload_cipher_layers
        .iter()
        .all(|layer| layer.payload_signatures.is_empty())
}

fn effective_keychain_uid(default_kuid: KeychainUid, layer_override: Option<KeychainUid>) -> KeychainUid {
    layer_override.unwrap_or(default_kuid)
}

pub struct CryptainerEncryptor<'a> {
    registry: &'a TrusteeRegistry,
}

impl<'a> CryptainerEncryptor<'a> {
    pub fn new(registry: &'a TrusteeRegistry) -> Self {
        Self { registry }
    }

    /// Build a finished cryptainer from `cryptoconf` and `plaintext` (§4.D steps 1-6).
    pub async fn encrypt(
        &self,
        cryptoconf: &Cryptoconf,
        plaintext: &[u8],
        keychain_uid: Option<KeychainUid>,
        cryptainer_metadata: Option<serde_json::Value>,
    ) -> Result<Cryptainer, CryptainerError> {
        if cryptoconf.payload_cipher_layers.is_empty() {
            return Err(CryptainerError::ConfigurationError(
                "cryptoconf must contain at least one payload_cipher_layer".to_string(),
            ));
        }

        let keychain_uid = keychain_uid.unwrap_or_else(KeychainUid::generate);
        let cryptainer_uid = Uuid::new_v4();

        let mut layers = Vec::with_capacity(cryptoconf.payload_cipher_layers.len());
        let mut ciphertext = plaintext.to_vec();

        for layer in &cryptoconf.payload_cipher_layers {
            let built = self.encrypt_one_layer(layer, &ciphertext, keychain_uid).await?;
            ciphertext = built.0;
            layers.push(built.1);
        }

        Ok(Cryptainer {
            cryptainer_uid,
            cryptainer_format: cryptainer_crypto::CRYPTAINER_FORMAT.to_string(),
            cryptainer_state: CryptainerState::Finished,
            keychain_uid,
            cryptainer_metadata,
            payload_ciphertext_struct: PayloadCiphertextStruct::Inline { ciphertext_value: ciphertext },
            payload_cipher_layers: layers,
        })
    }

    /// Encrypt the payload under one layer's symmetric cipher, wrap its key
    /// through the layer's key_cipher_layers, and compute its signatures.
    /// Returns the layer's ciphertext (fed as plaintext to the next layer)
    /// and the enriched `PayloadCipherLayer` record.
    async fn encrypt_one_layer(
        &self,
        layer: &PayloadCipherLayer,
        plaintext: &[u8],
        default_keychain_uid: KeychainUid,
    ) -> Result<(Vec<u8>, PayloadCipherLayer), CryptainerError> {
        let symkey = symmetric_cipher::generate_key(layer.payload_cipher_algo)?;
        let payload_ct = symmetric_cipher::encrypt(layer.payload_cipher_algo, &symkey, plaintext)?;

        let mut key_ciphertext = symkey.clone();
        for key_layer in &layer.key_cipher_layers {
            key_ciphertext = self.wrap_key_material(key_layer, &key_ciphertext, default_keychain_uid).await?;
        }

        let mut signatures = Vec::with_capacity(layer.payload_signatures.len());
        for sig in &layer.payload_signatures {
            let trustee = self.registry.resolve(&sig.payload_signature_trustee)?;
            let kuid = effective_keychain_uid(default_keychain_uid, sig.keychain_uid);
            let digest = digests::digest(sig.payload_digest_algo, &payload_ct.ciphertext);
            let signature_value = trustee
                .get_message_signature(kuid, &digest, sig.payload_signature_algo)
                .await?;
            signatures.push(PayloadSignature {
                payload_digest_algo: sig.payload_digest_algo,
                payload_signature_algo: sig.payload_signature_algo,
                payload_signature_trustee: sig.payload_signature_trustee.clone(),
                keychain_uid: sig.keychain_uid,
                signature_value: Some(signature_value),
                payload_digest_value: Some(digest),
            });
        }

        let payload_macs = if layer.payload_cipher_algo.is_authenticated() {
            Some(payload_ct.macs.into_iter().collect())
        } else {
            Some(std::collections::BTreeMap::new())
        };

        Ok((
            payload_ct.ciphertext,
            PayloadCipherLayer {
                payload_cipher_algo: layer.payload_cipher_algo,
                key_cipher_layers: layer.key_cipher_layers.clone(),
                payload_signatures: signatures,
                key_ciphertext: Some(key_ciphertext),
                payload_macs,
            },
        ))
    }

    /// Fold `key_bytes` through one entry of `key_cipher_layers` (§4.D step 4).
    #[async_recursion::async_recursion]
    async fn wrap_key_material(
        &self,
        key_layer: &KeyCipherLayer,
        key_bytes: &[u8],
        default_keychain_uid: KeychainUid,
    ) -> Result<Vec<u8>, CryptainerError> {
        match key_layer {
            KeyCipherLayer::PlainWrap { key_cipher_algo, key_cipher_trustee, keychain_uid } => {
                let trustee = self.registry.resolve(key_cipher_trustee)?;
                let kuid = effective_keychain_uid(default_keychain_uid, *keychain_uid);
                let key_algo = cryptainer_keystore::KeyAlgo::from(*key_cipher_algo);
                let public_key = trustee.fetch_public_key(kuid, key_algo, false).await?;
                Ok(asymmetric_cipher::wrap(*key_cipher_algo, &public_key, key_bytes)?)
            }
            KeyCipherLayer::SharedSecret { key_shared_secret_threshold, key_shared_secret_shards } => {
                let shard_count: u8 = key_shared_secret_shards
                    .len()
                    .try_into()
                    .map_err(|_| CryptainerError::ConfigurationError("too many shared-secret shards".to_string()))?;
                let shards = secret_sharing::split(key_bytes, *key_shared_secret_threshold, shard_count);

                let mut shard_ciphertexts = Vec::with_capacity(shards.len());
                for (shard_bytes, shard_layers) in shards.into_iter().zip(key_shared_secret_shards.iter()) {
                    let mut wrapped = shard_bytes;
                    for nested in shard_layers {
                        wrapped = self.wrap_key_material(nested, &wrapped, default_keychain_uid).await?;
                    }
                    shard_ciphertexts.push(wrapped);
                }

                Ok(serde_json::to_vec(&SharedSecretCiphertext { shard_ciphertexts })?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trustee_id::TrusteeDescriptor;
    use cryptainer_crypto::{AsymmetricCipherAlgo, DigestAlgo, PayloadCipherAlgo, SignatureAlgo};
    use cryptainer_keystore::{InMemoryBackend, Keystore, KeystorePool};
    use std::sync::Arc;

    fn registry() -> TrusteeRegistry {
        let factory = Arc::new(Keystore::new(Arc::new(InMemoryBackend::new())));
        TrusteeRegistry::new(Arc::new(KeystorePool::new(factory)))
    }

    fn simple_cryptoconf() -> Cryptoconf {
        Cryptoconf::new(vec![PayloadCipherLayer {
            payload_cipher_algo: PayloadCipherAlgo::AesCbc,
            key_cipher_layers: vec![KeyCipherLayer::PlainWrap {
                key_cipher_algo: AsymmetricCipherAlgo::RsaOaep,
                key_cipher_trustee: TrusteeDescriptor::LocalFactory,
                keychain_uid: None,
            }],
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
        }])
    }

    #[tokio::test]
    async fn encrypts_simple_cryptoconf_and_populates_fields() {
        let registry = registry();
        let encryptor = CryptainerEncryptor::new(&registry);
        let cryptainer = encryptor.encrypt(&simple_cryptoconf(), b"abc", None, None).await.unwrap();

        assert_eq!(cryptainer.cryptainer_state, CryptainerState::Finished);
        assert!(cryptainer.is_current_format());
        let layer = &cryptainer.payload_cipher_layers[0];
        assert!(layer.key_ciphertext.is_some());
        assert_eq!(layer.payload_signatures.len(), 1);
        assert!(layer.payload_signatures[0].signature_value.is_some());
    }

    #[tokio::test]
    async fn authenticated_layer_populates_macs() {
        let registry = registry();
        let encryptor = CryptainerEncryptor::new(&registry);
        let mut cryptoconf = simple_cryptoconf();
        cryptoconf.payload_cipher_layers[0].payload_cipher_algo = PayloadCipherAlgo::AesEax;
        cryptoconf.payload_cipher_layers[0].payload_signatures.clear();

        let cryptainer = encryptor.encrypt(&cryptoconf, b"secret", None, None).await.unwrap();
        let macs = cryptainer.payload_cipher_layers[0].payload_macs.as_ref().unwrap();
        assert!(macs.contains_key("tag"));
    }

    #[tokio::test]
    async fn shared_secret_layer_produces_recursive_ciphertext() {
        let registry = registry();
        let encryptor = CryptainerEncryptor::new(&registry);
        let mut cryptoconf = simple_cryptoconf();
        let shard = vec![KeyCipherLayer::PlainWrap {
            key_cipher_algo: AsymmetricCipherAlgo::RsaOaep,
            key_cipher_trustee: TrusteeDescriptor::LocalFactory,
            keychain_uid: None,
        }];
        cryptoconf.payload_cipher_layers[0].key_cipher_layers = vec![KeyCipherLayer::SharedSecret {
            key_shared_secret_threshold: 2,
            key_shared_secret_shards: vec![shard.clone(), shard.clone(), shard],
        }];
        cryptoconf.payload_cipher_layers[0].payload_signatures.clear();

        let cryptainer = encryptor.encrypt(&cryptoconf, b"abc", None, None).await.unwrap();
        let key_ciphertext = cryptainer.payload_cipher_layers[0].key_ciphertext.as_ref().unwrap();
        let parsed: SharedSecretCiphertext = serde_json::from_slice(key_ciphertext).unwrap();
        assert_eq!(parsed.shard_ciphertexts.len(), 3);
    }

    #[test]
    fn streamable_predicate_rejects_signed_layers() {
        assert!(!is_cryptainer_cryptoconf_streamable(&simple_cryptoconf()));
        let mut unsigned = simple_cryptoconf();
        unsigned.payload_cipher_layers[0].payload_signatures.clear();
        assert!(is_cryptainer_cryptoconf_streamable(&unsigned));
    }
}
