//! # cryptainer-storage
//!
//! Component H of the cryptainer engine (SPEC_FULL.md §4.H, §5): a
//! filesystem pool of cryptainers fed by a bounded background worker pool
//! built on `cryptainer-core`'s encryption/decryption pipelines, trimmed
//! after every write by count/age/quota purge policies.

pub mod filename;
pub mod purge;
pub mod storage;
pub mod task;
pub mod worker;

pub use purge::{CryptainerEntry, PurgeLimits};
pub use storage::{format_mtime_utc, CryptainerRef, CryptainerStorage, StorageConfig};
pub use task::{EncryptionJob, PayloadSource};
pub use worker::WorkerPool;
