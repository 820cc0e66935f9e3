//! Error taxonomy shared by every component in this crate (SPEC_FULL.md §7).
//!
//! One enum per crate boundary, hand-rolled `Display`/`Error` impls — no
//! `thiserror`/`anyhow`, matching `cryptainer-keystore::error`.

use std::fmt;

use cryptainer_keystore::KeystoreError;

#[derive(Debug)]
pub enum CryptainerError {
    /// Keystore lookup/attach miss, forwarded from `cryptainer-keystore`.
    KeyDoesNotExist(String),
    /// Write-once invariant violated.
    KeyAlreadyExists(String),
    /// Private key failed to decode — wrong passphrase, typically.
    KeyLoadingError(String),
    /// Any inability to recover plaintext: missing shards, exhausted
    /// passphrases, corrupt wrapping.
    DecryptionError(String),
    /// MAC or signature mismatch under `verify=true`.
    DecryptionIntegrityError(String),
    /// Trustee policy denies decryption.
    AuthorizationError(String),
    /// Empty or impossible cryptoconf.
    ConfigurationError(String),
    /// Structural schema failure; carries a path breadcrumb into the tree.
    ValidationError { path: String, message: String },
    /// Unknown cryptainer format, oversize signature input, unrecognized trustee.
    ValueError(String),
    /// I/O failure reading/writing a cryptainer or its sidecar.
    IoError(String),
}

impl fmt::Display for CryptainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyDoesNotExist(msg) => write!(f, "key does not exist: {}", msg),
            Self::KeyAlreadyExists(msg) => write!(f, "key already exists: {}", msg),
            Self::KeyLoadingError(msg) => write!(f, "key loading error: {}", msg),
            Self::DecryptionError(msg) => write!(f, "decryption error: {}", msg),
            Self::DecryptionIntegrityError(msg) => write!(f, "decryption integrity error: {}", msg),
            Self::AuthorizationError(msg) => write!(f, "authorization error: {}", msg),
            Self::ConfigurationError(msg) => write!(f, "configuration error: {}", msg),
            Self::ValidationError { path, message } => write!(f, "validation error at {}: {}", path, message),
            Self::ValueError(msg) => write!(f, "value error: {}", msg),
            Self::IoError(msg) => write!(f, "io error: {}", msg),
        }
    }
}

impl std::error::Error for CryptainerError {}

impl From<KeystoreError> for CryptainerError {
    fn from(e: KeystoreError) -> Self {
        match e {
            KeystoreError::KeyDoesNotExist { keychain_uid, key_algo } => {
                Self::KeyDoesNotExist(format!("({}, {})", keychain_uid, key_algo))
            }
            KeystoreError::KeyAlreadyExists { keychain_uid, key_algo } => {
                Self::KeyAlreadyExists(format!("({}, {})", keychain_uid, key_algo))
            }
            KeystoreError::KeyLoadingError(msg) => Self::KeyLoadingError(msg),
            KeystoreError::StorageError(msg) => Self::IoError(msg),
        }
    }
}

impl From<cryptainer_crypto::DecryptionError> for CryptainerError {
    fn from(_: cryptainer_crypto::DecryptionError) -> Self {
        Self::DecryptionError("cryptographic decryption failed".into())
    }
}

impl From<cryptainer_crypto::EncodingError> for CryptainerError {
    fn from(_: cryptainer_crypto::EncodingError) -> Self {
        Self::ConfigurationError("encoding error while preparing key material".into())
    }
}

impl From<std::io::Error> for CryptainerError {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}

impl From<serde_json::Error> for CryptainerError {
    fn from(e: serde_json::Error) -> Self {
        Self::ValueError(format!("malformed JSON: {}", e))
    }
}
