//! Asymmetric key-wrapping cipher behind the `RSA_OAEP` label.

use crate::algos::AsymmetricCipherAlgo;
use crate::envelope;
use crate::error::{DecryptionError, EncodingError};

/// Generate a fresh keypair for `algo`, serialized as (public_bytes, secret_bytes).
pub fn generate_keypair(algo: AsymmetricCipherAlgo) -> (Vec<u8>, Vec<u8>) {
    match algo {
        AsymmetricCipherAlgo::RsaOaep => envelope::generate_keypair(),
    }
}

/// Wrap `plaintext` (typically a symmetric key) under `public_key_bytes`.
pub fn wrap(
    algo: AsymmetricCipherAlgo,
    public_key_bytes: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, EncodingError> {
    match algo {
        AsymmetricCipherAlgo::RsaOaep => envelope::seal(public_key_bytes, plaintext),
    }
}

/// Unwrap a blob produced by `wrap` using `secret_key_bytes`.
pub fn unwrap(
    algo: AsymmetricCipherAlgo,
    secret_key_bytes: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, DecryptionError> {
    match algo {
        AsymmetricCipherAlgo::RsaOaep => envelope::open(secret_key_bytes, ciphertext),
    }
}
