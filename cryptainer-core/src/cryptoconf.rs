//! Cryptoconf and cryptainer data model (SPEC_FULL.md §3, §9).
//!
//! A cryptainer is a deep copy of its originating cryptoconf, enriched in
//! place with `key_ciphertext`/`payload_macs`/signature values — so a
//! single `PayloadCipherLayer`/`PayloadSignature` struct with optional
//! "result" fields serves both the input template and the finished
//! artifact, rather than duplicating the whole tree into two parallel type
//! hierarchies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cryptainer_crypto::{
    AsymmetricCipherAlgo, DigestAlgo, PayloadCipherAlgo, SignatureAlgo, CRYPTAINER_FORMAT,
};
use cryptainer_keystore::KeychainUid;

use crate::trustee_id::TrusteeDescriptor;

// ---------------------------------------------------------------------------
// Key-cipher layers (recursive: shared-secret nodes recurse into shards)
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "KeyCipherLayerWire", into = "KeyCipherLayerWire")]
pub enum KeyCipherLayer {
    PlainWrap {
        key_cipher_algo: AsymmetricCipherAlgo,
        key_cipher_trustee: TrusteeDescriptor,
        keychain_uid: Option<KeychainUid>,
    },
    SharedSecret {
        key_shared_secret_threshold: u8,
        key_shared_secret_shards: Vec<Vec<KeyCipherLayer>>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct KeyCipherLayerWire {
    key_cipher_algo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key_cipher_trustee: Option<TrusteeDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    keychain_uid: Option<KeychainUid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key_shared_secret_threshold: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key_shared_secret_shards: Option<Vec<Vec<KeyCipherLayerWire>>>,
}

impl TryFrom<KeyCipherLayerWire> for KeyCipherLayer {
    type Error = String;

    fn try_from(wire: KeyCipherLayerWire) -> Result<Self, Self::Error> {
        if wire.key_cipher_algo == cryptainer_crypto::SHARED_SECRET_ALGO_MARKER {
            let threshold = wire
                .key_shared_secret_threshold
                .ok_or("shared-secret key cipher layer missing key_shared_secret_threshold")?;
            let shards = wire
                .key_shared_secret_shards
                .ok_or("shared-secret key cipher layer missing key_shared_secret_shards")?;
            let shards = shards
                .into_iter()
                .map(|shard| shard.into_iter().map(KeyCipherLayer::try_from).collect())
                .collect::<Result<Vec<Vec<KeyCipherLayer>>, String>>()?;
            Ok(KeyCipherLayer::SharedSecret { key_shared_secret_threshold: threshold, key_shared_secret_shards: shards })
        } else {
            let algo = AsymmetricCipherAlgo::from_str(&wire.key_cipher_algo)
                .ok_or_else(|| format!("unknown key_cipher_algo: {}", wire.key_cipher_algo))?;
            let trustee = wire.key_cipher_trustee.ok_or("plain key cipher layer missing key_cipher_trustee")?;
            Ok(KeyCipherLayer::PlainWrap { key_cipher_algo: algo, key_cipher_trustee: trustee, keychain_uid: wire.keychain_uid })
        }
    }
}

impl From<KeyCipherLayer> for KeyCipherLayerWire {
    fn from(layer: KeyCipherLayer) -> Self {
        match layer {
            KeyCipherLayer::PlainWrap { key_cipher_algo, key_cipher_trustee, keychain_uid } => KeyCipherLayerWire {
                key_cipher_algo: key_cipher_algo.as_str().to_string(),
                key_cipher_trustee: Some(key_cipher_trustee),
                keychain_uid,
                key_shared_secret_threshold: None,
                key_shared_secret_shards: None,
            },
            KeyCipherLayer::SharedSecret { key_shared_secret_threshold, key_shared_secret_shards } => KeyCipherLayerWire {
                key_cipher_algo: cryptainer_crypto::SHARED_SECRET_ALGO_MARKER.to_string(),
                key_cipher_trustee: None,
                keychain_uid: None,
                key_shared_secret_threshold: Some(key_shared_secret_threshold),
                key_shared_secret_shards: Some(
                    key_shared_secret_shards
                        .into_iter()
                        .map(|shard| shard.into_iter().map(KeyCipherLayerWire::from).collect())
                        .collect(),
                ),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Payload signatures
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PayloadSignature {
    pub payload_digest_algo: DigestAlgo,
    pub payload_signature_algo: SignatureAlgo,
    pub payload_signature_trustee: TrusteeDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keychain_uid: Option<KeychainUid>,
    /// Populated by the encryptor (§4.D step 5); absent on a bare cryptoconf.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_value: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_digest_value: Option<Vec<u8>>,
}

// ---------------------------------------------------------------------------
// Payload cipher layers
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PayloadCipherLayer {
    pub payload_cipher_algo: PayloadCipherAlgo,
    pub key_cipher_layers: Vec<KeyCipherLayer>,
    pub payload_signatures: Vec<PayloadSignature>,
    /// Populated by the encryptor: the fully-wrapped symmetric key, after
    /// folding through every entry of `key_cipher_layers` in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_ciphertext: Option<Vec<u8>>,
    /// Authenticated-cipher tag(s); empty (not None) once populated for an
    /// unauthenticated algo, absent on a bare cryptoconf.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_macs: Option<BTreeMap<String, Vec<u8>>>,
}

// ---------------------------------------------------------------------------
// Cryptoconf: the input template
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cryptoconf {
    pub payload_cipher_layers: Vec<PayloadCipherLayer>,
}

impl Cryptoconf {
    pub fn new(payload_cipher_layers: Vec<PayloadCipherLayer>) -> Self {
        Self { payload_cipher_layers }
    }
}

// ---------------------------------------------------------------------------
// Cryptainer: the output artifact
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CryptainerState {
    #[serde(rename = "STARTED")]
    Started,
    #[serde(rename = "FINISHED")]
    Finished,
}

/// Either the raw ciphertext bytes, or the offloading marker (§3, §4.F).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadCiphertextStruct {
    Inline { ciphertext_value: Vec<u8> },
    Offloaded(String),
}

impl PayloadCiphertextStruct {
    pub fn is_offloaded(&self) -> bool {
        matches!(self, Self::Offloaded(marker) if marker == cryptainer_crypto::OFFLOADED_PAYLOAD_CIPHERTEXT_MARKER)
    }

    pub fn offloaded_marker() -> Self {
        Self::Offloaded(cryptainer_crypto::OFFLOADED_PAYLOAD_CIPHERTEXT_MARKER.to_string())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cryptainer {
    pub cryptainer_uid: Uuid,
    pub cryptainer_format: String,
    pub cryptainer_state: CryptainerState,
    pub keychain_uid: KeychainUid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cryptainer_metadata: Option<serde_json::Value>,
    pub payload_ciphertext_struct: PayloadCiphertextStruct,
    pub payload_cipher_layers: Vec<PayloadCipherLayer>,
}

impl Cryptainer {
    pub fn is_current_format(&self) -> bool {
        self.cryptainer_format == CRYPTAINER_FORMAT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_factory_layer() -> KeyCipherLayer {
        KeyCipherLayer::PlainWrap {
            key_cipher_algo: AsymmetricCipherAlgo::RsaOaep,
            key_cipher_trustee: TrusteeDescriptor::LocalFactory,
            keychain_uid: None,
        }
    }

    #[test]
    fn plain_wrap_roundtrips_through_json() {
        let layer = local_factory_layer();
        let json = serde_json::to_string(&layer).unwrap();
        assert!(json.contains("RSA_OAEP"));
        let back: KeyCipherLayer = serde_json::from_str(&json).unwrap();
        assert_eq!(layer, back);
    }

    #[test]
    fn shared_secret_roundtrips_and_recurses() {
        let layer = KeyCipherLayer::SharedSecret {
            key_shared_secret_threshold: 2,
            key_shared_secret_shards: vec![vec![local_factory_layer()], vec![local_factory_layer()]],
        };
        let json = serde_json::to_string(&layer).unwrap();
        assert!(json.contains("SHARED_SECRET"));
        let back: KeyCipherLayer = serde_json::from_str(&json).unwrap();
        assert_eq!(layer, back);
    }

    #[test]
    fn bare_local_factory_marker_string_parses_as_trustee() {
        let json = r#"{"key_cipher_algo": "RSA_OAEP", "key_cipher_trustee": "local_factory"}"#;
        let layer: KeyCipherLayer = serde_json::from_str(json).unwrap();
        match layer {
            KeyCipherLayer::PlainWrap { key_cipher_trustee, .. } => {
                assert_eq!(key_cipher_trustee, TrusteeDescriptor::LocalFactory)
            }
            _ => panic!("expected PlainWrap"),
        }
    }

    #[test]
    fn offloaded_marker_is_stable() {
        let marker = PayloadCiphertextStruct::offloaded_marker();
        assert!(marker.is_offloaded());
        let json = serde_json::to_string(&marker).unwrap();
        assert_eq!(json, "\"[OFFLOADED]\"");
    }
}
