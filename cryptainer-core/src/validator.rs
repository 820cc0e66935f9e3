//! Cryptoconf/cryptainer structural validation (component C, SPEC_FULL.md §4.C).
//!
//! Checks shape, not cryptography: required fields present, algos drawn
//! from the known enumerations, lists non-empty at every level, recursion
//! consistent. Errors carry a breadcrumb path into the tree so a caller can
//! point at exactly which node failed.

use crate::cryptoconf::{Cryptainer, Cryptoconf, KeyCipherLayer, PayloadCipherLayer};
use crate::error::CryptainerError;

/// A breadcrumb into the cryptoconf/cryptainer tree, rendered as a
/// dotted/bracketed path for display (e.g. `payload_cipher_layers[0].key_cipher_layers[1]`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Path(Vec<String>);

impl Path {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    fn child(&self, segment: impl Into<String>) -> Self {
        let mut path = self.0.clone();
        path.push(segment.into());
        Self(path)
    }

    fn index(&self, field: &str, idx: usize) -> Self {
        self.child(format!("{}[{}]", field, idx))
    }

    fn field(&self, field: &str) -> Self {
        self.child(field.to_string())
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.0.join("."))
        }
    }
}

fn fail(path: &Path, message: impl Into<String>) -> CryptainerError {
    CryptainerError::ValidationError { path: path.to_string(), message: message.into() }
}

/// Validate a cryptoconf (the input template): shape only, no enriched fields expected.
pub fn check_cryptoconf_sanity(cryptoconf: &Cryptoconf) -> Result<(), CryptainerError> {
    let root = Path::root();
    if cryptoconf.payload_cipher_layers.is_empty() {
        return Err(fail(&root.field("payload_cipher_layers"), "must contain at least one layer"));
    }
    for (i, layer) in cryptoconf.payload_cipher_layers.iter().enumerate() {
        check_payload_cipher_layer(layer, &root.index("payload_cipher_layers", i))?;
    }
    Ok(())
}

fn check_payload_cipher_layer(layer: &PayloadCipherLayer, path: &Path) -> Result<(), CryptainerError> {
    if layer.key_cipher_layers.is_empty() {
        return Err(fail(&path.field("key_cipher_layers"), "must contain at least one key cipher layer"));
    }
    for (i, kcl) in layer.key_cipher_layers.iter().enumerate() {
        check_key_cipher_layer(kcl, &path.index("key_cipher_layers", i))?;
    }
    for (i, sig) in layer.payload_signatures.iter().enumerate() {
        // payload_signature_trustee/algo are already-typed enums, so the
        // only remaining structural concern is the recursion-free shape;
        // nothing further to check here beyond "it parsed at all".
        let _ = (i, sig);
    }
    Ok(())
}

fn check_key_cipher_layer(layer: &KeyCipherLayer, path: &Path) -> Result<(), CryptainerError> {
    match layer {
        KeyCipherLayer::PlainWrap { .. } => Ok(()),
        KeyCipherLayer::SharedSecret { key_shared_secret_threshold, key_shared_secret_shards } => {
            let n = key_shared_secret_shards.len();
            let m = *key_shared_secret_threshold as usize;
            if n == 0 {
                return Err(fail(&path.field("key_shared_secret_shards"), "must contain at least one shard"));
            }
            if m == 0 || m > n {
                return Err(fail(
                    &path.field("key_shared_secret_threshold"),
                    format!("threshold {} must satisfy 1 <= threshold <= {} (shard count)", m, n),
                ));
            }
            for (i, shard) in key_shared_secret_shards.iter().enumerate() {
                let shard_path = path.index("key_shared_secret_shards", i);
                if shard.is_empty() {
                    return Err(fail(&shard_path, "shard must contain at least one key cipher layer"));
                }
                for (j, nested) in shard.iter().enumerate() {
                    check_key_cipher_layer(nested, &shard_path.child(format!("[{}]", j)))?;
                }
            }
            Ok(())
        }
    }
}

/// Validate a cryptainer: cryptoconf-shape checks plus the cryptainer-only
/// fields (uid, state, format, offloading marker type).
pub fn check_cryptainer_sanity(cryptainer: &Cryptainer) -> Result<(), CryptainerError> {
    let root = Path::root();

    if cryptainer.cryptainer_uid.is_nil() {
        return Err(fail(&root.field("cryptainer_uid"), "must not be the nil UUID"));
    }
    if !cryptainer.is_current_format() {
        return Err(fail(&root.field("cryptainer_format"), "unknown cryptainer format"));
    }
    if cryptainer.payload_cipher_layers.is_empty() {
        return Err(fail(&root.field("payload_cipher_layers"), "must contain at least one layer"));
    }

    for (i, layer) in cryptainer.payload_cipher_layers.iter().enumerate() {
        let path = root.index("payload_cipher_layers", i);
        check_payload_cipher_layer(layer, &path)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cryptoconf::{Cryptainer, CryptainerState, PayloadCiphertextStruct};
    use crate::trustee_id::TrusteeDescriptor;
    use cryptainer_crypto::{AsymmetricCipherAlgo, PayloadCipherAlgo};
    use cryptainer_keystore::KeychainUid;
    use uuid::Uuid;

    fn plain_wrap() -> KeyCipherLayer {
        KeyCipherLayer::PlainWrap {
            key_cipher_algo: AsymmetricCipherAlgo::RsaOaep,
            key_cipher_trustee: TrusteeDescriptor::LocalFactory,
            keychain_uid: None,
        }
    }

    fn one_layer_cryptoconf() -> Cryptoconf {
        Cryptoconf::new(vec![PayloadCipherLayer {
            payload_cipher_algo: PayloadCipherAlgo::AesCbc,
            key_cipher_layers: vec![plain_wrap()],
            payload_signatures: vec![],
            key_ciphertext: None,
            payload_macs: None,
        }])
    }

    #[test]
    fn accepts_minimal_valid_cryptoconf() {
        assert!(check_cryptoconf_sanity(&one_layer_cryptoconf()).is_ok());
    }

    #[test]
    fn rejects_empty_payload_cipher_layers() {
        let empty = Cryptoconf::new(vec![]);
        let err = check_cryptoconf_sanity(&empty).unwrap_err();
        assert!(matches!(err, CryptainerError::ValidationError { .. }));
    }

    #[test]
    fn rejects_empty_key_cipher_layers() {
        let mut conf = one_layer_cryptoconf();
        conf.payload_cipher_layers[0].key_cipher_layers.clear();
        let err = check_cryptoconf_sanity(&conf).unwrap_err();
        match err {
            CryptainerError::ValidationError { path, .. } => {
                assert!(path.contains("key_cipher_layers"))
            }
            _ => panic!("expected ValidationError"),
        }
    }

    #[test]
    fn rejects_threshold_above_shard_count() {
        let mut conf = one_layer_cryptoconf();
        conf.payload_cipher_layers[0].key_cipher_layers = vec![KeyCipherLayer::SharedSecret {
            key_shared_secret_threshold: 3,
            key_shared_secret_shards: vec![vec![plain_wrap()], vec![plain_wrap()]],
        }];
        let err = check_cryptoconf_sanity(&conf).unwrap_err();
        assert!(matches!(err, CryptainerError::ValidationError { .. }));
    }

    #[test]
    fn accepts_valid_shared_secret_node() {
        let mut conf = one_layer_cryptoconf();
        conf.payload_cipher_layers[0].key_cipher_layers = vec![KeyCipherLayer::SharedSecret {
            key_shared_secret_threshold: 2,
            key_shared_secret_shards: vec![vec![plain_wrap()], vec![plain_wrap()], vec![plain_wrap()]],
        }];
        assert!(check_cryptoconf_sanity(&conf).is_ok());
    }

    #[test]
    fn rejects_cryptainer_with_unknown_format() {
        let conf = one_layer_cryptoconf();
        let cryptainer = Cryptainer {
            cryptainer_uid: Uuid::new_v4(),
            cryptainer_format: "bogus_format".to_string(),
            cryptainer_state: CryptainerState::Started,
            keychain_uid: KeychainUid::generate(),
            cryptainer_metadata: None,
            payload_ciphertext_struct: PayloadCiphertextStruct::offloaded_marker(),
            payload_cipher_layers: conf.payload_cipher_layers,
        };
        let err = check_cryptainer_sanity(&cryptainer).unwrap_err();
        match err {
            CryptainerError::ValidationError { path, .. } => assert!(path.contains("cryptainer_format")),
            _ => panic!("expected ValidationError"),
        }
    }

    #[test]
    fn rejects_nil_cryptainer_uid() {
        let conf = one_layer_cryptoconf();
        let cryptainer = Cryptainer {
            cryptainer_uid: Uuid::nil(),
            cryptainer_format: cryptainer_crypto::CRYPTAINER_FORMAT.to_string(),
            cryptainer_state: CryptainerState::Started,
            keychain_uid: KeychainUid::generate(),
            cryptainer_metadata: None,
            payload_ciphertext_struct: PayloadCiphertextStruct::offloaded_marker(),
            payload_cipher_layers: conf.payload_cipher_layers,
        };
        assert!(check_cryptainer_sanity(&cryptainer).is_err());
    }
}
