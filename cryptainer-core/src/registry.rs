//! Resolves a `TrusteeDescriptor` node in a cryptoconf/cryptainer tree to a
//! live `Trustee` implementation, so the encryptor/decryptor never need to
//! know about keystores or RPC clients directly.

use std::sync::Arc;

use cryptainer_keystore::{AuthDeviceKeystoreUid, KeystorePool};

use crate::error::CryptainerError;
use crate::remote_trustee::RemoteTrustee;
use crate::trustee::{LocalTrustee, ReadonlyTrustee, Trustee};
use crate::trustee_id::TrusteeDescriptor;

pub struct TrusteeRegistry {
    local_factory: Arc<LocalTrustee>,
    pool: Arc<KeystorePool>,
}

impl TrusteeRegistry {
    pub fn new(pool: Arc<KeystorePool>) -> Self {
        let local_factory = Arc::new(LocalTrustee::new(pool.local_factory()));
        Self { local_factory, pool }
    }

    pub fn resolve(&self, descriptor: &TrusteeDescriptor) -> Result<Arc<dyn Trustee>, CryptainerError> {
        match descriptor {
            TrusteeDescriptor::LocalFactory => Ok(self.local_factory.clone()),
            TrusteeDescriptor::AuthDevice { keystore_uid } => {
                let keystore = self
                    .pool
                    .get_imported(AuthDeviceKeystoreUid(*keystore_uid))
                    .ok_or_else(|| CryptainerError::KeyDoesNotExist(format!("authdevice keystore {}", keystore_uid)))?;
                Ok(Arc::new(ReadonlyTrustee::new(keystore)))
            }
            TrusteeDescriptor::JsonRpc { url } => Ok(Arc::new(RemoteTrustee::new(url.clone()))),
        }
    }
}
