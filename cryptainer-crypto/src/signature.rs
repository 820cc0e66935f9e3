//! Signature provider. All three wire labels (`DSA_DSS`, `RSA_PSS`, `ECC_DSS`)
//! route to one Ed25519 implementation — see SPEC_FULL.md §6.A and DESIGN.md
//! for why the label space is wider than the implementation space here.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::OsRng;

use crate::algos::SignatureAlgo;
use crate::error::DecryptionError;

pub const SIGNING_KEY_BYTES: usize = 32;
pub const VERIFYING_KEY_BYTES: usize = 32;
pub const SIGNATURE_BYTES: usize = 64;

/// Generate a fresh Ed25519 keypair, returned as (verifying, signing) raw bytes.
pub fn generate_keypair() -> (Vec<u8>, Vec<u8>) {
    let signing = SigningKey::generate(&mut OsRng);
    let verifying = signing.verifying_key();
    (verifying.to_bytes().to_vec(), signing.to_bytes().to_vec())
}

/// Sign `message` (already pre-hashed by the caller) under `signing_key_bytes`.
///
/// `algo` only determines the label stamped onto the resulting signature
/// struct on the cryptainer side; the cryptographic operation is identical
/// for all three labels.
pub fn sign(
    signing_key_bytes: &[u8],
    algo: SignatureAlgo,
    message: &[u8],
) -> Result<Vec<u8>, DecryptionError> {
    let _ = algo;
    let key_bytes: [u8; SIGNING_KEY_BYTES] =
        signing_key_bytes.try_into().map_err(|_| DecryptionError)?;
    let signing = SigningKey::from_bytes(&key_bytes);
    Ok(signing.sign(message).to_bytes().to_vec())
}

/// Verify `signature` over `message` under `verifying_key_bytes`.
pub fn verify(
    verifying_key_bytes: &[u8],
    message: &[u8],
    signature_bytes: &[u8],
) -> Result<(), DecryptionError> {
    let key_bytes: [u8; VERIFYING_KEY_BYTES] = verifying_key_bytes
        .try_into()
        .map_err(|_| DecryptionError)?;
    let verifying = VerifyingKey::from_bytes(&key_bytes).map_err(|_| DecryptionError)?;
    let sig_bytes: [u8; SIGNATURE_BYTES] = signature_bytes.try_into().map_err(|_| DecryptionError)?;
    let signature = ed25519_dalek::Signature::from_bytes(&sig_bytes);
    verifying.verify(message, &signature).map_err(|_| DecryptionError)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_roundtrips() {
        let (verifying, signing) = generate_keypair();
        let sig = sign(&signing, SignatureAlgo::DsaDss, b"hello").unwrap();
        assert!(verify(&verifying, b"hello", &sig).is_ok());
    }

    #[test]
    fn tampered_message_fails_verify() {
        let (verifying, signing) = generate_keypair();
        let sig = sign(&signing, SignatureAlgo::EccDss, b"hello").unwrap();
        assert!(verify(&verifying, b"goodbye", &sig).is_err());
    }

    #[test]
    fn all_three_labels_use_same_provider() {
        let (verifying, signing) = generate_keypair();
        for algo in [SignatureAlgo::DsaDss, SignatureAlgo::RsaPss, SignatureAlgo::EccDss] {
            let sig = sign(&signing, algo, b"msg").unwrap();
            assert!(verify(&verifying, b"msg", &sig).is_ok());
        }
    }
}
