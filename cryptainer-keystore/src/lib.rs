//! # cryptainer-keystore
//!
//! Component A of the cryptainer engine: a persistent map from
//! `(keychain_uid, key_algo)` to public/private key material, plus a pool
//! of pre-generated "free" keypairs that a background generator worker
//! keeps topped up, and a `KeystorePool` that tracks the process-wide
//! local-factory keystore alongside any imported authdevice keystores.
//!
//! This crate only persists and serves raw key bytes — it has no opinion
//! about what a trustee does with them; that lives in `cryptainer-core`.

pub mod audit;
pub mod error;
pub mod generator;
pub mod keystore;
pub mod pool;
pub mod storage;
pub mod types;

pub use error::KeystoreError;
pub use generator::{spawn as spawn_free_key_generator, GeneratorConfig, GeneratorHandle};
pub use keystore::Keystore;
pub use pool::{local_factory_keystore, KeystorePool};
pub use storage::{FileBackend, InMemoryBackend, StorageBackend};
pub use types::{AuthDeviceKeystoreUid, KeyAlgo, KeyMaterial, KeychainUid, KEY_ALGOS_BY_ORDINAL};
