//! `KeystorePool`: the local-factory keystore singleton plus imported
//! authdevice keystores, looked up by `keystore_uid` (§4.A).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::storage::InMemoryBackend;
use crate::types::AuthDeviceKeystoreUid;
use crate::Keystore;

/// Holds one "local factory" `Keystore` and any number of imported
/// authdevice keystores, addressed by `AuthDeviceKeystoreUid`.
pub struct KeystorePool {
    local_factory: Arc<Keystore>,
    imported: HashMap<AuthDeviceKeystoreUid, Arc<Keystore>>,
}

impl KeystorePool {
    pub fn new(local_factory: Arc<Keystore>) -> Self {
        Self { local_factory, imported: HashMap::new() }
    }

    pub fn local_factory(&self) -> Arc<Keystore> {
        self.local_factory.clone()
    }

    pub fn import_keystore(&mut self, uid: AuthDeviceKeystoreUid, keystore: Arc<Keystore>) {
        self.imported.insert(uid, keystore);
    }

    pub fn get_imported(&self, uid: AuthDeviceKeystoreUid) -> Option<Arc<Keystore>> {
        self.imported.get(&uid).cloned()
    }
}

/// Process-wide local-factory singleton, constructed lazily on first use
/// rather than via global mutable state (§9).
static LOCAL_FACTORY: OnceCell<Arc<Keystore>> = OnceCell::const_new();

pub async fn local_factory_keystore() -> Arc<Keystore> {
    LOCAL_FACTORY
        .get_or_init(|| async { Arc::new(Keystore::new(Arc::new(InMemoryBackend::new()))) })
        .await
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{KeyAlgo, KeychainUid};

    #[tokio::test]
    async fn local_factory_singleton_is_stable_across_calls() {
        let a = local_factory_keystore().await;
        let kuid = KeychainUid::generate();
        a.set_keys(kuid, KeyAlgo::RsaOaep, vec![1], vec![2]).unwrap();

        let b = local_factory_keystore().await;
        assert_eq!(b.get_public_key(kuid, KeyAlgo::RsaOaep).unwrap(), vec![1]);
    }

    #[test]
    fn pool_tracks_imported_keystores() {
        let factory = Arc::new(Keystore::new(Arc::new(InMemoryBackend::new())));
        let mut pool = KeystorePool::new(factory);
        let imported = Arc::new(Keystore::new(Arc::new(InMemoryBackend::new())));
        let uid = AuthDeviceKeystoreUid(uuid::Uuid::new_v4());
        pool.import_keystore(uid, imported);
        assert!(pool.get_imported(uid).is_some());

        let other_uid = AuthDeviceKeystoreUid(uuid::Uuid::new_v4());
        assert!(pool.get_imported(other_uid).is_none());
    }
}
