//! Hybrid-KEM envelope: wraps a small blob of key material under a public key.
//!
//! A `seal`/`open` pair (hybrid X25519 + ML-KEM-768 KEM, HKDF-SHA256,
//! AES-256-GCM) used as the concrete implementation behind the `RSA_OAEP`
//! asymmetric key-cipher label — see `asymmetric.rs`.

use zeroize::Zeroizing;

use crate::aead;
use crate::error::{DecryptionError, EncodingError};
use crate::kdf;
use crate::kem::{HybridX25519MlKem768Provider as Provider, KemProvider, PublicKey, SecretKey};
use crate::wire;

/// Generate a fresh hybrid keypair, serialized as (public_bytes, secret_bytes).
pub fn generate_keypair() -> (Vec<u8>, Vec<u8>) {
    let (pk, sk) = Provider::keygen();
    (pk.to_bytes().to_vec(), sk.to_bytes().to_vec())
}

/// Seal `plaintext` (small key material) under the public key `pk_bytes`.
pub fn seal(pk_bytes: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, EncodingError> {
    let pk = PublicKey::from_bytes(pk_bytes).map_err(|_| EncodingError)?;
    let (ss_raw, kem_ct) = Provider::encapsulate(&pk)?;
    let shared_secret = Zeroizing::new(ss_raw);
    let ct_hash = kdf::ct_hash(&kem_ct);
    let aes_key = Zeroizing::new(kdf::derive_key(&shared_secret, &ct_hash, b"")?);
    let nonce = aead::nonce()?;
    let aead_ct = aead::aead_seal(&aes_key, &nonce, plaintext, b"")?;
    wire::encode_wire(&kem_ct, &nonce, &aead_ct)
}

/// Open a blob produced by `seal` using the secret key `sk_bytes`.
pub fn open(sk_bytes: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
    let sk = SecretKey::from_bytes(sk_bytes)?;
    let parts = wire::decode_wire(ciphertext)?;
    let ss_raw = Provider::decapsulate(&sk, parts.kem_ciphertext)?;
    let shared_secret = Zeroizing::new(ss_raw);
    let ct_hash = kdf::ct_hash(parts.kem_ciphertext);
    let aes_key =
        Zeroizing::new(kdf::derive_key(&shared_secret, &ct_hash, b"").map_err(|_| DecryptionError)?);
    aead::aead_open(&aes_key, parts.nonce, parts.aead_ciphertext, b"")
}
