//! # cryptainer-crypto
//!
//! Narrow-interface crypto providers for the cryptainer engine. Each
//! algorithm enum named by a cryptoconf/cryptainer (`algos.rs`) resolves to
//! exactly one concrete provider in this crate:
//!
//! - symmetric payload ciphers (`symmetric.rs`): `AES_CBC`, `AES_EAX`, `CHACHA20_POLY1305`
//! - the asymmetric key-wrapping cipher (`asymmetric.rs`): `RSA_OAEP`, served by
//!   the hybrid X25519 + ML-KEM-768 envelope this crate started life as
//!   (`envelope.rs`, `kem.rs`, `aead.rs`, `kdf.rs`, `wire.rs`)
//! - signatures (`signature.rs`): `DSA_DSS`, `RSA_PSS`, `ECC_DSS`, all Ed25519
//! - digests (`digest.rs`): `SHA256`, `SHA512`, `SHA3_256`, `SHA3_512`
//! - Shamir-style secret sharing (`sharing.rs`)
//!
//! None of this module is a new cryptographic construction: every provider
//! is a direct call into an audited RustCrypto-family crate (or, for the
//! authenticated symmetric ciphers, a standard Encrypt-then-MAC composition
//! of two such crates — see `symmetric.rs`).

#![deny(unsafe_code)]

mod aead;
mod algos;
mod asymmetric;
mod digest;
mod envelope;
mod error;
mod kdf;
mod kem;
mod signature;
mod sharing;
mod symmetric;
mod wire;

pub use algos::{
    AsymmetricCipherAlgo, DigestAlgo, PayloadCipherAlgo, SignatureAlgo,
    CRYPTAINER_FORMAT, CRYPTAINER_TEMP_SUFFIX, LOCAL_FACTORY_TRUSTEE_MARKER,
    OFFLOADED_PAYLOAD_CIPHERTEXT_MARKER, SHARED_SECRET_ALGO_MARKER,
};
pub use error::{DecryptionError, EncodingError};

pub mod asymmetric_cipher {
    pub use crate::asymmetric::{generate_keypair, unwrap, wrap};
}

pub mod signature_suite {
    pub use crate::signature::{generate_keypair, sign, verify};
}

pub mod digests {
    pub use crate::digest::digest;
}

pub mod secret_sharing {
    pub use crate::sharing::{recover, split};
}

pub mod symmetric_cipher {
    pub use crate::symmetric::{decrypt, encrypt, generate_key, SymmetricCiphertext};
}
