//! `CryptainerStorage` (component H, SPEC_FULL.md §4.H): a filesystem pool of
//! cryptainers fed by a bounded background worker pool, trimmed after every
//! write by count/age/quota purge policies.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::warn;

use cryptainer_core::{
    Cryptainer, CryptainerDecryptor, CryptainerEncryptionStream, CryptainerEncryptor,
    CryptainerError, Cryptoconf, PassphraseMapper, TrusteeRegistry,
};
use cryptainer_keystore::{KeychainUid, KeystorePool};

use crate::filename;
use crate::purge::{entries_to_purge, CryptainerEntry, PurgeLimits};
use crate::task::{EncryptionJob, PayloadSource};
use crate::worker::WorkerPool;

const CRYPTAINER_EXTENSION: &str = filename::CRYPTAINER_EXTENSION;

/// Tuning knobs fixed at construction time.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub cryptainer_dir: PathBuf,
    pub default_cryptoconf: Option<Cryptoconf>,
    pub offload_payload_ciphertext: bool,
    pub max_cryptainer_count: Option<i64>,
    pub max_cryptainer_age_secs: Option<i64>,
    pub max_cryptainer_quota_bytes: Option<i64>,
    pub worker_concurrency: usize,
    pub queue_capacity: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cryptainer_dir: PathBuf::from("."),
            default_cryptoconf: None,
            offload_payload_ciphertext: true,
            max_cryptainer_count: None,
            max_cryptainer_age_secs: None,
            max_cryptainer_quota_bytes: None,
            worker_concurrency: 4,
            queue_capacity: 64,
        }
    }
}

/// Resolve a cryptainer by stored name or by position in the sorted listing.
pub enum CryptainerRef<'a> {
    Name(&'a str),
    Index(usize),
}

pub struct CryptainerStorage {
    config: StorageConfig,
    registry: Arc<TrusteeRegistry>,
    pool: WorkerPool,
}

impl CryptainerStorage {
    pub fn new(config: StorageConfig, keystore_pool: Arc<KeystorePool>) -> std::io::Result<Self> {
        std::fs::create_dir_all(&config.cryptainer_dir)?;
        let registry = Arc::new(TrusteeRegistry::new(keystore_pool));
        let pool = WorkerPool::spawn(config.queue_capacity, config.worker_concurrency);
        Ok(Self { config, registry, pool })
    }

    fn purge_limits(&self) -> PurgeLimits {
        PurgeLimits {
            max_cryptainer_count: self.config.max_cryptainer_count,
            max_cryptainer_age_secs: self.config.max_cryptainer_age_secs,
            max_cryptainer_quota_bytes: self.config.max_cryptainer_quota_bytes,
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.config.cryptainer_dir.join(name)
    }

    fn scan_entries(&self) -> std::io::Result<Vec<CryptainerEntry>> {
        scan_dir(&self.config.cryptainer_dir)
    }

    /// Schedule `payload` for background encryption under `filename` (minus
    /// extension) into a freshly claimed `.crypt` name. Fails fast if no
    /// cryptoconf is available; everything past that point runs in the
    /// background worker pool and is logged rather than propagated (§4.H).
    pub async fn enqueue_file_for_encryption(
        &self,
        filename_base: &str,
        payload: PayloadSource,
        metadata: Option<serde_json::Value>,
        cryptoconf: Option<Cryptoconf>,
        keychain_uid: Option<KeychainUid>,
    ) -> Result<(), CryptainerError> {
        let cryptoconf = cryptoconf
            .or_else(|| self.config.default_cryptoconf.clone())
            .ok_or_else(|| CryptainerError::ConfigurationError(
                "no cryptoconf given and no default_cryptoconf configured".to_string(),
            ))?;

        let existing: Vec<String> = self.scan_entries()?.into_iter().map(|e| e.name).collect();
        let claimed_name = filename::claim_name(filename_base, &existing);
        let job = EncryptionJob { filename: claimed_name, payload, metadata, cryptoconf, keychain_uid };

        let registry = self.registry.clone();
        let cryptainer_dir = self.config.cryptainer_dir.clone();
        let offload = self.config.offload_payload_ciphertext;
        let limits = self.purge_limits();

        self.pool
            .submit(Box::pin(run_encryption_job(job, registry, cryptainer_dir, offload, limits)))
            .await;

        Ok(())
    }

    /// Block until every enqueued job (including any still sitting in the
    /// channel) has completed.
    pub async fn wait_for_idle_state(&self) {
        self.pool.wait_for_idle().await;
    }

    /// `.crypt` names present in `cryptainer_dir`, ignoring sidecars and
    /// temp-suffixed in-flight files.
    pub fn list_cryptainer_names(
        &self,
        as_sorted_list: bool,
        as_absolute_paths: bool,
    ) -> Result<Vec<String>, CryptainerError> {
        let mut names: Vec<String> = self.scan_entries()?.into_iter().map(|e| e.name).collect();
        if as_sorted_list {
            names.sort();
        }
        if as_absolute_paths {
            names = names
                .into_iter()
                .map(|n| self.path_for(&n).to_string_lossy().into_owned())
                .collect();
        }
        Ok(names)
    }

    fn resolve_name(&self, which: CryptainerRef<'_>) -> Result<String, CryptainerError> {
        match which {
            CryptainerRef::Name(name) => Ok(name.to_string()),
            CryptainerRef::Index(idx) => {
                let mut names = self.list_cryptainer_names(true, false)?;
                if idx >= names.len() {
                    return Err(CryptainerError::ValueError(format!(
                        "cryptainer index {} out of range (have {})",
                        idx,
                        names.len()
                    )));
                }
                Ok(names.swap_remove(idx))
            }
        }
    }

    pub fn load_cryptainer_from_storage(
        &self,
        which: CryptainerRef<'_>,
        include_payload_ciphertext: bool,
    ) -> Result<Cryptainer, CryptainerError> {
        let name = self.resolve_name(which)?;
        cryptainer_core::io::load(&self.path_for(&name), include_payload_ciphertext)
    }

    pub async fn decrypt_cryptainer_from_storage(
        &self,
        name: &str,
        passphrase_mapper: Option<&PassphraseMapper>,
        verify: bool,
    ) -> Result<Vec<u8>, CryptainerError> {
        let cryptainer = cryptainer_core::io::load(&self.path_for(name), true)?;
        let decryptor = CryptainerDecryptor::new(&self.registry);
        let empty_mapper = PassphraseMapper::new();
        let mapper = passphrase_mapper.unwrap_or(&empty_mapper);
        decryptor.decrypt(&cryptainer, mapper, verify).await
    }

    pub fn delete_cryptainer(&self, name: &str) -> Result<(), CryptainerError> {
        cryptainer_core::io::delete(&self.path_for(name))
    }

    pub fn check_cryptainer_sanity(&self, name: &str) -> Result<(), CryptainerError> {
        let cryptainer = cryptainer_core::io::load(&self.path_for(name), false)?;
        cryptainer_core::validator::check_cryptainer_sanity(&cryptainer)
    }

    /// Begin a streaming encryption into a freshly claimed name derived from
    /// `filename_base` (§4.D streaming variant, §4.H).
    pub fn create_cryptainer_encryption_stream(
        &self,
        filename_base: &str,
        metadata: Option<serde_json::Value>,
        cryptoconf: Cryptoconf,
        dump_initial_cryptainer: bool,
    ) -> Result<CryptainerEncryptionStream<'_>, CryptainerError> {
        let existing: Vec<String> = self.scan_entries()?.into_iter().map(|e| e.name).collect();
        let claimed_name = filename::claim_name(filename_base, &existing);
        let path = self.path_for(&claimed_name);
        CryptainerEncryptionStream::start(&self.registry, path, cryptoconf, None, metadata, dump_initial_cryptainer)
    }
}

/// The body of one background encryption job (§4.H): read the payload,
/// encrypt it, publish it, then re-run the purge policies. Runs entirely
/// inside the worker pool; its `Result` is caught and logged there, never
/// propagated to the `enqueue_file_for_encryption` caller.
async fn run_encryption_job(
    job: EncryptionJob,
    registry: Arc<TrusteeRegistry>,
    cryptainer_dir: PathBuf,
    offload: bool,
    limits: PurgeLimits,
) -> Result<(), CryptainerError> {
    let plaintext = match job.payload {
        PayloadSource::Bytes(bytes) => bytes,
        PayloadSource::FilePath(path) => {
            let bytes = std::fs::read(&path)?;
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "could not delete source file after enqueue");
            }
            bytes
        }
    };

    let cryptainer = CryptainerEncryptor::new(&registry)
        .encrypt(&job.cryptoconf, &plaintext, job.keychain_uid, job.metadata)
        .await?;
    let path = cryptainer_dir.join(&job.filename);
    cryptainer_core::io::dump(&path, &cryptainer, offload)?;

    let entries = scan_dir(&cryptainer_dir)?;
    for name in entries_to_purge(&entries, limits, SystemTime::now()) {
        cryptainer_core::io::delete(&cryptainer_dir.join(&name))?;
    }
    Ok(())
}

/// Render an mtime as `YYYYMMDD_HHMMSS` UTC (§6 date/time format), for
/// display purposes only — purge decisions always use raw `SystemTime`.
pub fn format_mtime_utc(mtime: SystemTime) -> String {
    chrono::DateTime::<chrono::Utc>::from(mtime).format("%Y%m%d_%H%M%S").to_string()
}

fn scan_dir(dir: &Path) -> std::io::Result<Vec<CryptainerEntry>> {
    let mut entries = Vec::new();
    for dirent in std::fs::read_dir(dir)? {
        let dirent = dirent?;
        let path = dirent.path();
        if path.extension().and_then(|e| e.to_str()) != Some(CRYPTAINER_EXTENSION) {
            continue;
        }
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n.to_string(),
            None => continue,
        };
        let metadata = dirent.metadata()?;
        let mtime = metadata.modified()?;
        let size_bytes = cryptainer_core::io::total_size(&path).unwrap_or(metadata.len());
        entries.push(CryptainerEntry { name, mtime, size_bytes });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptainer_core::{KeyCipherLayer, PayloadCipherLayer, TrusteeDescriptor};
    use cryptainer_crypto::{AsymmetricCipherAlgo, PayloadCipherAlgo};
    use cryptainer_keystore::{InMemoryBackend, Keystore};

    fn factory_pool() -> Arc<KeystorePool> {
        Arc::new(KeystorePool::new(Arc::new(Keystore::new(Arc::new(InMemoryBackend::new())))))
    }

    fn simple_cryptoconf() -> Cryptoconf {
        Cryptoconf::new(vec![PayloadCipherLayer {
            payload_cipher_algo: PayloadCipherAlgo::AesCbc,
            key_cipher_layers: vec![KeyCipherLayer::PlainWrap {
                key_cipher_algo: AsymmetricCipherAlgo::RsaOaep,
                key_cipher_trustee: TrusteeDescriptor::LocalFactory,
                keychain_uid: None,
            }],
            payload_signatures: vec![],
            key_ciphertext: None,
            payload_macs: None,
        }])
    }

    #[tokio::test]
    async fn enqueue_then_idle_then_list_round_trips_a_cryptainer() {
        let tmp = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            cryptainer_dir: tmp.path().to_path_buf(),
            default_cryptoconf: Some(simple_cryptoconf()),
            ..Default::default()
        };
        let storage = CryptainerStorage::new(config, factory_pool()).unwrap();

        storage
            .enqueue_file_for_encryption("report.pdf", PayloadSource::Bytes(b"hello".to_vec()), None, None, None)
            .await
            .unwrap();
        storage.wait_for_idle_state().await;

        let names = storage.list_cryptainer_names(true, false).unwrap();
        assert_eq!(names, vec!["report.crypt".to_string()]);

        let plaintext = storage
            .decrypt_cryptainer_from_storage("report.crypt", None, false)
            .await
            .unwrap();
        assert_eq!(plaintext, b"hello");
    }

    #[tokio::test]
    async fn enqueue_without_any_cryptoconf_fails_fast() {
        let tmp = tempfile::tempdir().unwrap();
        let config = StorageConfig { cryptainer_dir: tmp.path().to_path_buf(), ..Default::default() };
        let storage = CryptainerStorage::new(config, factory_pool()).unwrap();

        let err = storage
            .enqueue_file_for_encryption("report.pdf", PayloadSource::Bytes(b"hello".to_vec()), None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CryptainerError::ConfigurationError(_)));
    }

    #[tokio::test]
    async fn purge_by_count_keeps_only_the_newest_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            cryptainer_dir: tmp.path().to_path_buf(),
            default_cryptoconf: Some(simple_cryptoconf()),
            max_cryptainer_count: Some(1),
            ..Default::default()
        };
        let storage = CryptainerStorage::new(config, factory_pool()).unwrap();

        storage
            .enqueue_file_for_encryption("a", PayloadSource::Bytes(b"1".to_vec()), None, None, None)
            .await
            .unwrap();
        storage.wait_for_idle_state().await;
        storage
            .enqueue_file_for_encryption("b", PayloadSource::Bytes(b"2".to_vec()), None, None, None)
            .await
            .unwrap();
        storage.wait_for_idle_state().await;

        let names = storage.list_cryptainer_names(true, false).unwrap();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn format_mtime_renders_utc_timestamp() {
        let epoch_plus_one_day = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(86400);
        assert_eq!(format_mtime_utc(epoch_plus_one_day), "19700102_000000");
    }
}
