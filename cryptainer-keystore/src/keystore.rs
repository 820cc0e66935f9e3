//! Keystore: the abstract `(keychain_uid, key_algo)`-keyed store, plus its
//! free-key pool. No rotation policy, no threat scoring — just storage and
//! free-pool management.

use std::sync::Arc;

use tracing::debug;

use crate::audit::{audit_event, AuditAction};
use crate::error::KeystoreError;
use crate::storage::StorageBackend;
use crate::types::{KeyAlgo, KeyMaterial, KeychainUid};

pub struct Keystore {
    storage: Arc<dyn StorageBackend>,
}

impl Keystore {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Bind a keypair to `(kuid, algo)`. Fails with `KeyAlreadyExists` if one
    /// is already bound there.
    pub fn set_keys(
        &self,
        kuid: KeychainUid,
        algo: KeyAlgo,
        public: Vec<u8>,
        private: Vec<u8>,
    ) -> Result<(), KeystoreError> {
        let result = self.storage.set_keys(kuid, algo, &KeyMaterial { public, private });
        audit_event(AuditAction::SetKeys, Some(kuid), algo, result.is_ok());
        result
    }

    pub fn get_public_key(&self, kuid: KeychainUid, algo: KeyAlgo) -> Result<Vec<u8>, KeystoreError> {
        let result = self.storage.get_public_key(kuid, algo);
        if result.is_err() {
            debug!(%kuid, algo = algo.as_str(), "public key lookup missed");
        }
        result
    }

    pub fn get_private_key(&self, kuid: KeychainUid, algo: KeyAlgo) -> Result<Vec<u8>, KeystoreError> {
        let result = self.storage.get_private_key(kuid, algo);
        if result.is_err() {
            debug!(%kuid, algo = algo.as_str(), "private key lookup missed");
        }
        result
    }

    pub fn contains(&self, kuid: KeychainUid, algo: KeyAlgo) -> Result<bool, KeystoreError> {
        self.storage.contains(kuid, algo)
    }

    // -----------------------------------------------------------------------
    // Free-key pool
    // -----------------------------------------------------------------------

    pub fn get_free_keypairs_count(&self, algo: KeyAlgo) -> Result<usize, KeystoreError> {
        self.storage.free_keypairs_count(algo)
    }

    pub fn add_free_keypair(
        &self,
        algo: KeyAlgo,
        public: Vec<u8>,
        private: Vec<u8>,
    ) -> Result<(), KeystoreError> {
        let result = self.storage.push_free_keypair(algo, KeyMaterial { public, private });
        audit_event(AuditAction::AddFreeKeypair, None, algo, result.is_ok());
        result
    }

    /// Consume one free keypair of `algo` and bind it to `kuid`. Fails with
    /// `KeyDoesNotExist` when the pool is empty for that algo.
    pub fn attach_free_keypair_to_uuid(
        &self,
        kuid: KeychainUid,
        algo: KeyAlgo,
    ) -> Result<(), KeystoreError> {
        let material = self
            .storage
            .pop_free_keypair(algo)?
            .ok_or(KeystoreError::KeyDoesNotExist { keychain_uid: kuid, key_algo: algo })?;
        let result = self.storage.set_keys(kuid, algo, &material);
        audit_event(AuditAction::AttachFreeKeypair, Some(kuid), algo, result.is_ok());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryBackend;

    fn keystore() -> Keystore {
        Keystore::new(Arc::new(InMemoryBackend::new()))
    }

    #[test]
    fn set_keys_then_read_back() {
        let ks = keystore();
        let kuid = KeychainUid::generate();
        ks.set_keys(kuid, KeyAlgo::RsaOaep, vec![1], vec![2]).unwrap();
        assert_eq!(ks.get_public_key(kuid, KeyAlgo::RsaOaep).unwrap(), vec![1]);
        assert_eq!(ks.get_private_key(kuid, KeyAlgo::RsaOaep).unwrap(), vec![2]);
    }

    #[test]
    fn set_keys_twice_fails() {
        let ks = keystore();
        let kuid = KeychainUid::generate();
        ks.set_keys(kuid, KeyAlgo::RsaOaep, vec![1], vec![2]).unwrap();
        assert!(matches!(
            ks.set_keys(kuid, KeyAlgo::RsaOaep, vec![3], vec![4]),
            Err(KeystoreError::KeyAlreadyExists { .. })
        ));
    }

    #[test]
    fn get_missing_key_fails() {
        let ks = keystore();
        let kuid = KeychainUid::generate();
        assert!(matches!(
            ks.get_public_key(kuid, KeyAlgo::RsaOaep),
            Err(KeystoreError::KeyDoesNotExist { .. })
        ));
    }

    #[test]
    fn attach_free_keypair_consumes_pool_entry() {
        let ks = keystore();
        let kuid = KeychainUid::generate();
        assert!(matches!(
            ks.attach_free_keypair_to_uuid(kuid, KeyAlgo::DsaDss),
            Err(KeystoreError::KeyDoesNotExist { .. })
        ));

        ks.add_free_keypair(KeyAlgo::DsaDss, vec![9], vec![8]).unwrap();
        assert_eq!(ks.get_free_keypairs_count(KeyAlgo::DsaDss).unwrap(), 1);

        ks.attach_free_keypair_to_uuid(kuid, KeyAlgo::DsaDss).unwrap();
        assert_eq!(ks.get_free_keypairs_count(KeyAlgo::DsaDss).unwrap(), 0);
        assert_eq!(ks.get_public_key(kuid, KeyAlgo::DsaDss).unwrap(), vec![9]);
    }
}
