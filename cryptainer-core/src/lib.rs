//! # cryptainer-core
//!
//! The cryptainer engine: cryptoconf validation, the trustee abstraction,
//! and the encryption/decryption pipelines described in SPEC_FULL.md §§3-4.
//! `cryptainer-storage` builds its background worker pool on top of the
//! types exported here; `cryptainer-cli`/`cryptainer-api` are thin operator
//! surfaces over the same API.

pub mod cryptoconf;
pub mod dependency;
pub mod error;
pub mod io;
pub mod passphrase;
pub mod registry;
pub mod remote_trustee;
pub mod streaming;
pub mod trustee;
pub mod trustee_id;
pub mod validator;

mod decryptor;
mod encryptor;

pub use cryptoconf::{
    Cryptainer, CryptainerState, Cryptoconf, KeyCipherLayer, PayloadCipherLayer,
    PayloadCiphertextStruct, PayloadSignature,
};
pub use decryptor::CryptainerDecryptor;
pub use encryptor::{is_cryptainer_cryptoconf_streamable, CryptainerEncryptor};
pub use error::CryptainerError;
pub use passphrase::PassphraseMapper;
pub use registry::TrusteeRegistry;
pub use streaming::CryptainerEncryptionStream;
pub use trustee::{
    DecryptionAuthorizationResponse, KeypairIdentifier, KeypairStatus, LocalTrustee,
    ReadonlyTrustee, Trustee,
};
pub use trustee_id::TrusteeDescriptor;
