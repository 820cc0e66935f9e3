//! Storage backends: where keypairs and the free-key pool live.
//!
//! `InMemoryBackend`/`FileBackend` pair keyed on `(KeychainUid, KeyAlgo)`,
//! with public and private material always split into separate files — the
//! two must never be co-encoded (§4.A).

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use crate::error::KeystoreError;
use crate::types::{KeyAlgo, KeyMaterial, KeychainUid};

pub trait StorageBackend: Send + Sync {
    fn set_keys(
        &self,
        kuid: KeychainUid,
        algo: KeyAlgo,
        material: &KeyMaterial,
    ) -> Result<(), KeystoreError>;
    fn get_public_key(&self, kuid: KeychainUid, algo: KeyAlgo) -> Result<Vec<u8>, KeystoreError>;
    fn get_private_key(&self, kuid: KeychainUid, algo: KeyAlgo) -> Result<Vec<u8>, KeystoreError>;
    fn contains(&self, kuid: KeychainUid, algo: KeyAlgo) -> Result<bool, KeystoreError>;

    fn free_keypairs_count(&self, algo: KeyAlgo) -> Result<usize, KeystoreError>;
    fn push_free_keypair(&self, algo: KeyAlgo, material: KeyMaterial) -> Result<(), KeystoreError>;
    /// Atomically pop one free keypair of `algo`, if any.
    fn pop_free_keypair(&self, algo: KeyAlgo) -> Result<Option<KeyMaterial>, KeystoreError>;
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryBackend {
    keys: RwLock<HashMap<(uuid::Uuid, KeyAlgo), KeyMaterial>>,
    free: Mutex<HashMap<KeyAlgo, VecDeque<KeyMaterial>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for InMemoryBackend {
    fn set_keys(
        &self,
        kuid: KeychainUid,
        algo: KeyAlgo,
        material: &KeyMaterial,
    ) -> Result<(), KeystoreError> {
        let mut keys = self.keys.write().unwrap();
        let key = (kuid.0, algo);
        if keys.contains_key(&key) {
            return Err(KeystoreError::KeyAlreadyExists { keychain_uid: kuid, key_algo: algo });
        }
        keys.insert(key, material.clone());
        Ok(())
    }

    fn get_public_key(&self, kuid: KeychainUid, algo: KeyAlgo) -> Result<Vec<u8>, KeystoreError> {
        let keys = self.keys.read().unwrap();
        keys.get(&(kuid.0, algo))
            .map(|m| m.public.clone())
            .ok_or(KeystoreError::KeyDoesNotExist { keychain_uid: kuid, key_algo: algo })
    }

    fn get_private_key(&self, kuid: KeychainUid, algo: KeyAlgo) -> Result<Vec<u8>, KeystoreError> {
        let keys = self.keys.read().unwrap();
        keys.get(&(kuid.0, algo))
            .map(|m| m.private.clone())
            .ok_or(KeystoreError::KeyDoesNotExist { keychain_uid: kuid, key_algo: algo })
    }

    fn contains(&self, kuid: KeychainUid, algo: KeyAlgo) -> Result<bool, KeystoreError> {
        Ok(self.keys.read().unwrap().contains_key(&(kuid.0, algo)))
    }

    fn free_keypairs_count(&self, algo: KeyAlgo) -> Result<usize, KeystoreError> {
        Ok(self.free.lock().unwrap().get(&algo).map_or(0, VecDeque::len))
    }

    fn push_free_keypair(&self, algo: KeyAlgo, material: KeyMaterial) -> Result<(), KeystoreError> {
        self.free.lock().unwrap().entry(algo).or_default().push_back(material);
        Ok(())
    }

    fn pop_free_keypair(&self, algo: KeyAlgo) -> Result<Option<KeyMaterial>, KeystoreError> {
        Ok(self.free.lock().unwrap().entry(algo).or_default().pop_front())
    }
}

// ---------------------------------------------------------------------------
// Filesystem backend
// ---------------------------------------------------------------------------

/// Directory layout:
/// ```text
/// {dir}/keys/{kuid}_{algo}.pub
/// {dir}/keys/{kuid}_{algo}.priv
/// {dir}/free/{algo}/{NNNNNNNN}.pub
/// {dir}/free/{algo}/{NNNNNNNN}.priv
/// ```
/// A single in-process `Mutex` serializes free-pool pop/push so two
/// concurrent callers never hand out the same keypair. This backend is
/// single-writer-per-directory across processes (§9, Open Question (b));
/// within one process every mutating op here is atomic.
pub struct FileBackend {
    dir: PathBuf,
    free_lock: Mutex<()>,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, KeystoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(dir.join("keys"))
            .map_err(|e| KeystoreError::StorageError(format!("create keys dir: {}", e)))?;
        std::fs::create_dir_all(dir.join("free"))
            .map_err(|e| KeystoreError::StorageError(format!("create free dir: {}", e)))?;
        Ok(Self { dir, free_lock: Mutex::new(()) })
    }

    fn key_paths(&self, kuid: KeychainUid, algo: KeyAlgo) -> (PathBuf, PathBuf) {
        let base = self.dir.join("keys").join(format!("{}_{}", kuid.0, algo.as_str()));
        (base.with_extension("pub"), base.with_extension("priv"))
    }

    fn free_dir(&self, algo: KeyAlgo) -> PathBuf {
        self.dir.join("free").join(algo.as_str())
    }

    fn write_exclusive(path: &Path, bytes: &[u8]) -> Result<(), KeystoreError> {
        use std::fs::OpenOptions;
        use std::io::Write;
        let mut f = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| KeystoreError::StorageError(format!("create {}: {}", path.display(), e)))?;
        f.write_all(bytes)
            .map_err(|e| KeystoreError::StorageError(format!("write {}: {}", path.display(), e)))
    }
}

impl StorageBackend for FileBackend {
    fn set_keys(
        &self,
        kuid: KeychainUid,
        algo: KeyAlgo,
        material: &KeyMaterial,
    ) -> Result<(), KeystoreError> {
        let (pub_path, priv_path) = self.key_paths(kuid, algo);
        if pub_path.exists() || priv_path.exists() {
            return Err(KeystoreError::KeyAlreadyExists { keychain_uid: kuid, key_algo: algo });
        }
        Self::write_exclusive(&pub_path, &material.public).map_err(|_| {
            KeystoreError::KeyAlreadyExists { keychain_uid: kuid, key_algo: algo }
        })?;
        Self::write_exclusive(&priv_path, &material.private).map_err(|_| {
            KeystoreError::KeyAlreadyExists { keychain_uid: kuid, key_algo: algo }
        })?;
        Ok(())
    }

    fn get_public_key(&self, kuid: KeychainUid, algo: KeyAlgo) -> Result<Vec<u8>, KeystoreError> {
        let (pub_path, _) = self.key_paths(kuid, algo);
        std::fs::read(&pub_path)
            .map_err(|_| KeystoreError::KeyDoesNotExist { keychain_uid: kuid, key_algo: algo })
    }

    fn get_private_key(&self, kuid: KeychainUid, algo: KeyAlgo) -> Result<Vec<u8>, KeystoreError> {
        let (_, priv_path) = self.key_paths(kuid, algo);
        std::fs::read(&priv_path)
            .map_err(|_| KeystoreError::KeyDoesNotExist { keychain_uid: kuid, key_algo: algo })
    }

    fn contains(&self, kuid: KeychainUid, algo: KeyAlgo) -> Result<bool, KeystoreError> {
        let (pub_path, _) = self.key_paths(kuid, algo);
        Ok(pub_path.exists())
    }

    fn free_keypairs_count(&self, algo: KeyAlgo) -> Result<usize, KeystoreError> {
        let dir = self.free_dir(algo);
        if !dir.exists() {
            return Ok(0);
        }
        let entries = std::fs::read_dir(&dir)
            .map_err(|e| KeystoreError::StorageError(format!("readdir: {}", e)))?;
        let count = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("pub"))
            .count();
        Ok(count)
    }

    fn push_free_keypair(&self, algo: KeyAlgo, material: KeyMaterial) -> Result<(), KeystoreError> {
        let _guard = self.free_lock.lock().unwrap();
        let dir = self.free_dir(algo);
        std::fs::create_dir_all(&dir)
            .map_err(|e| KeystoreError::StorageError(format!("create dir: {}", e)))?;
        let idx = std::fs::read_dir(&dir)
            .map_err(|e| KeystoreError::StorageError(format!("readdir: {}", e)))?
            .count();
        let base = dir.join(format!("{:08}", idx));
        Self::write_exclusive(&base.with_extension("pub"), &material.public)?;
        Self::write_exclusive(&base.with_extension("priv"), &material.private)?;
        Ok(())
    }

    fn pop_free_keypair(&self, algo: KeyAlgo) -> Result<Option<KeyMaterial>, KeystoreError> {
        let _guard = self.free_lock.lock().unwrap();
        let dir = self.free_dir(algo);
        if !dir.exists() {
            return Ok(None);
        }
        let mut entries: Vec<PathBuf> = std::fs::read_dir(&dir)
            .map_err(|e| KeystoreError::StorageError(format!("readdir: {}", e)))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|x| x.to_str()) == Some("pub"))
            .collect();
        entries.sort();
        let Some(pub_path) = entries.into_iter().next() else {
            return Ok(None);
        };
        let priv_path = pub_path.with_extension("priv");
        let public = std::fs::read(&pub_path)
            .map_err(|e| KeystoreError::StorageError(format!("read: {}", e)))?;
        let private = std::fs::read(&priv_path)
            .map_err(|e| KeystoreError::StorageError(format!("read: {}", e)))?;
        std::fs::remove_file(&pub_path)
            .map_err(|e| KeystoreError::StorageError(format!("remove: {}", e)))?;
        std::fs::remove_file(&priv_path)
            .map_err(|e| KeystoreError::StorageError(format!("remove: {}", e)))?;
        Ok(Some(KeyMaterial { public, private }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_roundtrips_and_rejects_duplicates() {
        let backend = InMemoryBackend::new();
        let kuid = KeychainUid::generate();
        let material = KeyMaterial { public: vec![1, 2, 3], private: vec![4, 5, 6] };
        backend.set_keys(kuid, KeyAlgo::RsaOaep, &material).unwrap();
        assert_eq!(backend.get_public_key(kuid, KeyAlgo::RsaOaep).unwrap(), vec![1, 2, 3]);
        assert_eq!(backend.get_private_key(kuid, KeyAlgo::RsaOaep).unwrap(), vec![4, 5, 6]);
        assert!(matches!(
            backend.set_keys(kuid, KeyAlgo::RsaOaep, &material),
            Err(KeystoreError::KeyAlreadyExists { .. })
        ));
    }

    #[test]
    fn in_memory_missing_key_errors() {
        let backend = InMemoryBackend::new();
        let kuid = KeychainUid::generate();
        assert!(matches!(
            backend.get_public_key(kuid, KeyAlgo::RsaOaep),
            Err(KeystoreError::KeyDoesNotExist { .. })
        ));
    }

    #[test]
    fn in_memory_free_pool_is_fifo() {
        let backend = InMemoryBackend::new();
        let first = KeyMaterial { public: vec![1], private: vec![1] };
        let second = KeyMaterial { public: vec![2], private: vec![2] };
        backend.push_free_keypair(KeyAlgo::DsaDss, first.clone()).unwrap();
        backend.push_free_keypair(KeyAlgo::DsaDss, second.clone()).unwrap();
        assert_eq!(backend.free_keypairs_count(KeyAlgo::DsaDss).unwrap(), 2);
        assert_eq!(backend.pop_free_keypair(KeyAlgo::DsaDss).unwrap().unwrap().public, first.public);
        assert_eq!(backend.pop_free_keypair(KeyAlgo::DsaDss).unwrap().unwrap().public, second.public);
        assert!(backend.pop_free_keypair(KeyAlgo::DsaDss).unwrap().is_none());
    }

    #[test]
    fn file_backend_splits_public_and_private_into_separate_files() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(tmp.path()).unwrap();
        let kuid = KeychainUid::generate();
        let material = KeyMaterial { public: vec![9, 9], private: vec![7, 7] };
        backend.set_keys(kuid, KeyAlgo::EccDss, &material).unwrap();
        let (pub_path, priv_path) = backend.key_paths(kuid, KeyAlgo::EccDss);
        assert_ne!(pub_path, priv_path);
        assert_eq!(std::fs::read(pub_path).unwrap(), vec![9, 9]);
        assert_eq!(std::fs::read(priv_path).unwrap(), vec![7, 7]);
    }

    #[test]
    fn file_backend_free_pool_roundtrips() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(tmp.path()).unwrap();
        let material = KeyMaterial { public: vec![1, 2], private: vec![3, 4] };
        backend.push_free_keypair(KeyAlgo::RsaOaep, material.clone()).unwrap();
        assert_eq!(backend.free_keypairs_count(KeyAlgo::RsaOaep).unwrap(), 1);
        let popped = backend.pop_free_keypair(KeyAlgo::RsaOaep).unwrap().unwrap();
        assert_eq!(popped.public, material.public);
        assert_eq!(backend.free_keypairs_count(KeyAlgo::RsaOaep).unwrap(), 0);
    }
}
