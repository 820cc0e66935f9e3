//! Error types for the keystore (§7).

use std::fmt;

use crate::types::{KeyAlgo, KeychainUid};

#[derive(Debug)]
pub enum KeystoreError {
    /// Lookup or free-pool attach missed (§4.A).
    KeyDoesNotExist { keychain_uid: KeychainUid, key_algo: KeyAlgo },
    /// Write-once invariant violated: `set_keys` called twice for the same key.
    KeyAlreadyExists { keychain_uid: KeychainUid, key_algo: KeyAlgo },
    /// Private key failed to decode — typically a wrong passphrase.
    KeyLoadingError(String),
    StorageError(String),
}

impl fmt::Display for KeystoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyDoesNotExist { keychain_uid, key_algo } => {
                write!(f, "key does not exist: ({}, {})", keychain_uid, key_algo)
            }
            Self::KeyAlreadyExists { keychain_uid, key_algo } => {
                write!(f, "key already exists: ({}, {})", keychain_uid, key_algo)
            }
            Self::KeyLoadingError(msg) => write!(f, "key loading error: {}", msg),
            Self::StorageError(msg) => write!(f, "storage error: {}", msg),
        }
    }
}

impl std::error::Error for KeystoreError {}
