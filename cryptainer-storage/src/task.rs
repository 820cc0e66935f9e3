//! The unit of work handed to `enqueue_file_for_encryption` (SPEC_FULL.md §4.H).

use std::path::PathBuf;

use cryptainer_core::Cryptoconf;
use cryptainer_keystore::KeychainUid;

/// Either raw plaintext bytes, or a filesystem path whose contents should be
/// read and, on success, best-effort deleted (§9c).
pub enum PayloadSource {
    Bytes(Vec<u8>),
    FilePath(PathBuf),
}

pub struct EncryptionJob {
    pub filename: String,
    pub payload: PayloadSource,
    pub metadata: Option<serde_json::Value>,
    pub cryptoconf: Cryptoconf,
    pub keychain_uid: Option<KeychainUid>,
}
