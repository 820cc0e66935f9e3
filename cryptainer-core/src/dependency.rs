//! Dependency analyzer (component G, SPEC_FULL.md §4.G): walks a list of
//! cryptainers and reports which (trustee, keychain_uid, key_algo) triples
//! are needed to encrypt (fetch public keys for) or to sign/verify them.
//!
//! Recurses into shared-secret subtrees so a Shamir node's shard-trustees
//! each get their own entry rather than being flattened into the outer
//! layer's trustee.

use std::collections::BTreeMap;

use cryptainer_keystore::{KeyAlgo, KeychainUid};

use crate::cryptoconf::{Cryptainer, KeyCipherLayer, PayloadCipherLayer};
use crate::trustee_id::TrusteeDescriptor;

/// One (keychain_uid, key_algo) pair a trustee is asked to serve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct KeyId {
    pub keychain_uid: KeychainUid,
    pub key_algo: KeyAlgo,
}

/// One trustee's required key ids, deduplicated, alongside its descriptor
/// (needed to actually resolve/contact it later).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrusteeDependencies {
    pub trustee: Option<TrusteeDescriptor>,
    pub key_ids: Vec<KeyId>,
}

/// `{encryption: {trustee_id: (trustee_desc, [key_ids])}, signature: {...}}` (§4.G).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DependencyReport {
    pub encryption: BTreeMap<String, TrusteeDependencies>,
    pub signature: BTreeMap<String, TrusteeDependencies>,
}

fn record(map: &mut BTreeMap<String, TrusteeDependencies>, trustee: &TrusteeDescriptor, key_id: KeyId) {
    let entry = map.entry(trustee.identity_key()).or_insert_with(|| TrusteeDependencies {
        trustee: Some(trustee.clone()),
        key_ids: Vec::new(),
    });
    if !entry.key_ids.contains(&key_id) {
        entry.key_ids.push(key_id);
    }
}

fn walk_key_cipher_layer(
    layer: &KeyCipherLayer,
    default_keychain_uid: KeychainUid,
    encryption: &mut BTreeMap<String, TrusteeDependencies>,
) {
    match layer {
        KeyCipherLayer::PlainWrap { key_cipher_algo, key_cipher_trustee, keychain_uid } => {
            let kuid = keychain_uid.unwrap_or(default_keychain_uid);
            let key_algo = KeyAlgo::from(*key_cipher_algo);
            record(encryption, key_cipher_trustee, KeyId { keychain_uid: kuid, key_algo });
        }
        KeyCipherLayer::SharedSecret { key_shared_secret_shards, .. } => {
            for shard in key_shared_secret_shards {
                for nested in shard {
                    walk_key_cipher_layer(nested, default_keychain_uid, encryption);
                }
            }
        }
    }
}

fn walk_payload_cipher_layer(
    layer: &PayloadCipherLayer,
    default_keychain_uid: KeychainUid,
    report: &mut DependencyReport,
) {
    for key_layer in &layer.key_cipher_layers {
        walk_key_cipher_layer(key_layer, default_keychain_uid, &mut report.encryption);
    }
    for sig in &layer.payload_signatures {
        let kuid = sig.keychain_uid.unwrap_or(default_keychain_uid);
        let key_algo = KeyAlgo::from(sig.payload_signature_algo);
        record(&mut report.signature, &sig.payload_signature_trustee, KeyId { keychain_uid: kuid, key_algo });
    }
}

/// Walk one cryptainer and accumulate its trustee dependencies into `report`.
pub fn analyze_one(cryptainer: &Cryptainer, report: &mut DependencyReport) {
    for layer in &cryptainer.payload_cipher_layers {
        walk_payload_cipher_layer(layer, cryptainer.keychain_uid, report);
    }
}

/// Walk a list of cryptainers and return the union of their trustee
/// dependencies (§4.G, §8 idempotence/union properties).
pub fn analyze(cryptainers: &[Cryptainer]) -> DependencyReport {
    let mut report = DependencyReport::default();
    for cryptainer in cryptainers {
        analyze_one(cryptainer, &mut report);
    }
    report
}
