//! Trustee abstraction (component B, SPEC_FULL.md §4.B), grounded in
//! `original_source/src/wacryptolib/escrow.py`'s `EscrowApi`/`ReadonlyEscrowApi`.
//!
//! A trustee is anything that holds or gates access to a keypair: the
//! process-local factory, a fixed read-only set imported from a key-device,
//! or a remote service reached over RPC (`remote_trustee.rs`). All three
//! implement one async trait so the encryptor/decryptor stay generic over
//! trustee kind, with swappable concrete backends behind it.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use cryptainer_crypto::{digests, signature_suite, symmetric_cipher, AsymmetricCipherAlgo, DigestAlgo, PayloadCipherAlgo, SignatureAlgo};
use cryptainer_keystore::{KeyAlgo, Keystore, KeychainUid};

use crate::error::CryptainerError;

/// Signature input over 2*SHA512 length is almost certainly un-hashed
/// payload data, not a digest — reject it outright (§4.B).
pub const MAX_PAYLOAD_LENGTH_FOR_SIGNATURE: usize = 128;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeypairIdentifier {
    pub keychain_uid: KeychainUid,
    pub key_algo: KeyAlgo,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeypairStatus {
    Accepted,
    MissingPrivateKey,
    AuthorizationMissing,
    MissingPassphrase,
}

#[derive(Clone, Debug)]
pub struct DecryptionAuthorizationResponse {
    pub response_message: String,
    pub has_errors: bool,
    pub keypair_statuses: Vec<(KeypairIdentifier, KeypairStatus)>,
}

/// Wire form of an asymmetric-cipher "cipherdict": the narrow interface
/// underneath only ever deals in opaque serialized blobs (§6.A), so this is
/// just a newtype for the bytes `asymmetric_cipher::wrap`/`unwrap` exchange.
pub type CipherBlob = Vec<u8>;

#[async_trait]
pub trait Trustee: Send + Sync {
    async fn fetch_public_key(
        &self,
        kuid: KeychainUid,
        key_algo: KeyAlgo,
        must_exist: bool,
    ) -> Result<Vec<u8>, CryptainerError>;

    async fn get_message_signature(
        &self,
        kuid: KeychainUid,
        message: &[u8],
        signature_algo: SignatureAlgo,
    ) -> Result<Vec<u8>, CryptainerError>;

    async fn request_decryption_authorization(
        &self,
        keypair_identifiers: &[KeypairIdentifier],
        request_message: &str,
        passphrases: &[String],
    ) -> Result<DecryptionAuthorizationResponse, CryptainerError>;

    async fn decrypt_with_private_key(
        &self,
        kuid: KeychainUid,
        encryption_algo: AsymmetricCipherAlgo,
        cipherdict: &CipherBlob,
        passphrases: &[String],
    ) -> Result<Vec<u8>, CryptainerError>;
}

// ---------------------------------------------------------------------------
// Passphrase-protected private key storage
// ---------------------------------------------------------------------------
//
// The keystore itself is passphrase-agnostic: it stores whatever bytes a
// trustee hands it. A trustee that wants passphrase protection encrypts the
// private key material before calling `set_keys`, using the symmetric
// AES_EAX provider already in `cryptainer-crypto` (its HMAC tag doubles as
// the "is this the right passphrase" check): a stored blob that fails to
// decrypt under a candidate key is exactly a wrong-passphrase signal.

const PASSPHRASE_MARKER: &[u8] = b"CRYPTAINER_PPENC\0";

#[derive(Serialize, Deserialize)]
struct EncryptedPrivateKeyWire {
    ciphertext: Vec<u8>,
    tag: Vec<u8>,
}

fn passphrase_key(passphrase: &str) -> Vec<u8> {
    digests::digest(DigestAlgo::Sha256, passphrase.as_bytes())
}

fn encrypt_private_key(private: &[u8], passphrase: Option<&str>) -> Vec<u8> {
    let Some(passphrase) = passphrase else {
        return private.to_vec();
    };
    let key = passphrase_key(passphrase);
    let ct = symmetric_cipher::encrypt(PayloadCipherAlgo::AesEax, &key, private)
        .expect("encrypting a freshly-generated private key cannot fail");
    let tag = ct.macs.get("tag").expect("AES_EAX always produces a tag").clone();
    let wire = EncryptedPrivateKeyWire { ciphertext: ct.ciphertext, tag };
    let mut out = PASSPHRASE_MARKER.to_vec();
    out.extend_from_slice(&serde_json::to_vec(&wire).expect("wire struct always serializes"));
    out
}

/// Try one candidate passphrase against stored private-key bytes. `None`
/// always succeeds against an unencrypted stored key (an unencrypted PEM
/// tolerates being "unlocked" with any or no passphrase), matching
/// `load_asymmetric_key_from_pem_bytestring`'s behavior in the original.
fn try_decrypt_private_key(stored: &[u8], passphrase: Option<&str>) -> Option<Vec<u8>> {
    if let Some(body) = stored.strip_prefix(PASSPHRASE_MARKER) {
        let passphrase = passphrase?;
        let wire: EncryptedPrivateKeyWire = serde_json::from_slice(body).ok()?;
        let key = passphrase_key(passphrase);
        let ct = symmetric_cipher::SymmetricCiphertext {
            ciphertext: wire.ciphertext,
            macs: std::iter::once(("tag".to_string(), wire.tag)).collect(),
        };
        symmetric_cipher::decrypt(PayloadCipherAlgo::AesEax, &key, &ct, true).ok()
    } else {
        Some(stored.to_vec())
    }
}

/// Try `[None] + passphrases` in order, same priority order the original
/// `_decrypt_private_key_pem_with_passphrases` uses so unprotected keys
/// never require a passphrase to be supplied.
fn decrypt_private_key_with_passphrases(
    stored: &[u8],
    passphrases: &[String],
) -> Result<Vec<u8>, CryptainerError> {
    if let Some(plain) = try_decrypt_private_key(stored, None) {
        return Ok(plain);
    }
    for passphrase in passphrases {
        if let Some(plain) = try_decrypt_private_key(stored, Some(passphrase.as_str())) {
            return Ok(plain);
        }
    }
    Err(CryptainerError::DecryptionError(format!(
        "Could not decrypt private key (passphrases provided: {})",
        passphrases.len()
    )))
}

// ---------------------------------------------------------------------------
// LocalTrustee
// ---------------------------------------------------------------------------

/// Trustee backed by a local keystore that autogenerates keypairs on demand.
pub struct LocalTrustee {
    keystore: Arc<Keystore>,
}

impl LocalTrustee {
    pub fn new(keystore: Arc<Keystore>) -> Self {
        Self { keystore }
    }

    /// `_ensure_keypair_exists`: pull from the free pool, else generate
    /// inline. Always passphrase-free, matching the original's `passphrase=None`.
    fn ensure_keypair_exists(&self, kuid: KeychainUid, algo: KeyAlgo) -> Result<(), CryptainerError> {
        if self.keystore.contains(kuid, algo)? {
            return Ok(());
        }
        match self.keystore.attach_free_keypair_to_uuid(kuid, algo) {
            Ok(()) => Ok(()),
            Err(cryptainer_keystore::KeystoreError::KeyDoesNotExist { .. }) => {
                let (public, private) = algo.generate_keypair();
                self.keystore.set_keys(kuid, algo, public, private)?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Generate a keypair directly under `kuid`, protected by `passphrase`
    /// (test/setup helper; mirrors `generate_keypair_for_storage`).
    pub fn generate_and_store_keypair(
        &self,
        kuid: KeychainUid,
        algo: KeyAlgo,
        passphrase: Option<&str>,
    ) -> Result<(), CryptainerError> {
        let (public, private) = algo.generate_keypair();
        let private = encrypt_private_key(&private, passphrase);
        self.keystore.set_keys(kuid, algo, public, private)?;
        Ok(())
    }

    /// Base-implementation authorization policy: always permitted. Subclasses
    /// (not modeled here — see `ReadonlyTrustee`) would override this.
    fn check_keypair_authorization(&self, _kuid: KeychainUid, _algo: KeyAlgo) -> Result<(), CryptainerError> {
        Ok(())
    }
}

#[async_trait]
impl Trustee for LocalTrustee {
    async fn fetch_public_key(
        &self,
        kuid: KeychainUid,
        key_algo: KeyAlgo,
        must_exist: bool,
    ) -> Result<Vec<u8>, CryptainerError> {
        if !must_exist {
            self.ensure_keypair_exists(kuid, key_algo)?;
        }
        Ok(self.keystore.get_public_key(kuid, key_algo)?)
    }

    async fn get_message_signature(
        &self,
        kuid: KeychainUid,
        message: &[u8],
        signature_algo: SignatureAlgo,
    ) -> Result<Vec<u8>, CryptainerError> {
        if message.len() > MAX_PAYLOAD_LENGTH_FOR_SIGNATURE {
            return Err(CryptainerError::ValueError(
                "Message too big for signing, only a hash should be sent".to_string(),
            ));
        }
        let key_algo = KeyAlgo::from(signature_algo);
        self.ensure_keypair_exists(kuid, key_algo)?;
        let private_stored = self.keystore.get_private_key(kuid, key_algo)?;
        let private = decrypt_private_key_with_passphrases(&private_stored, &[])?;
        Ok(signature_suite::sign(&private, signature_algo, message)?)
    }

    async fn request_decryption_authorization(
        &self,
        keypair_identifiers: &[KeypairIdentifier],
        request_message: &str,
        passphrases: &[String],
    ) -> Result<DecryptionAuthorizationResponse, CryptainerError> {
        let _ = request_message;
        if keypair_identifiers.is_empty() {
            return Err(CryptainerError::ValueError(
                "Keypair identifiers must not be empty, when requesting decryption authorization".to_string(),
            ));
        }

        let mut statuses = Vec::with_capacity(keypair_identifiers.len());
        let mut accepted_count = 0usize;

        for &identifier in keypair_identifiers {
            if self.check_keypair_authorization(identifier.keychain_uid, identifier.key_algo).is_err() {
                statuses.push((identifier, KeypairStatus::AuthorizationMissing));
                continue;
            }

            let private_stored = match self.keystore.get_private_key(identifier.keychain_uid, identifier.key_algo) {
                Ok(bytes) => bytes,
                Err(_) => {
                    statuses.push((identifier, KeypairStatus::MissingPrivateKey));
                    continue;
                }
            };

            if decrypt_private_key_with_passphrases(&private_stored, passphrases).is_err() {
                statuses.push((identifier, KeypairStatus::MissingPassphrase));
                continue;
            }

            statuses.push((identifier, KeypairStatus::Accepted));
            accepted_count += 1;
        }

        let has_errors = accepted_count < keypair_identifiers.len();
        Ok(DecryptionAuthorizationResponse {
            response_message: if has_errors {
                "Decryption request denied".to_string()
            } else {
                "Decryption request accepted".to_string()
            },
            has_errors,
            keypair_statuses: statuses,
        })
    }

    async fn decrypt_with_private_key(
        &self,
        kuid: KeychainUid,
        encryption_algo: AsymmetricCipherAlgo,
        cipherdict: &CipherBlob,
        passphrases: &[String],
    ) -> Result<Vec<u8>, CryptainerError> {
        let key_algo = KeyAlgo::from(encryption_algo);
        let private_stored = self.keystore.get_private_key(kuid, key_algo)?;
        let private = decrypt_private_key_with_passphrases(&private_stored, passphrases)?;
        Ok(cryptainer_crypto::asymmetric_cipher::unwrap(encryption_algo, &private, cipherdict)?)
    }
}

// ---------------------------------------------------------------------------
// ReadonlyTrustee
// ---------------------------------------------------------------------------

/// Trustee backed by a fixed keystore (e.g. imported from a key-device):
/// never generates keys, whatever `must_exist` says.
pub struct ReadonlyTrustee {
    inner: LocalTrustee,
}

impl ReadonlyTrustee {
    pub fn new(keystore: Arc<Keystore>) -> Self {
        Self { inner: LocalTrustee::new(keystore) }
    }
}

#[async_trait]
impl Trustee for ReadonlyTrustee {
    async fn fetch_public_key(
        &self,
        kuid: KeychainUid,
        key_algo: KeyAlgo,
        _must_exist: bool,
    ) -> Result<Vec<u8>, CryptainerError> {
        self.inner.keystore.get_public_key(kuid, key_algo).map_err(|e| match e {
            cryptainer_keystore::KeystoreError::KeyDoesNotExist { keychain_uid, key_algo } => {
                CryptainerError::KeyDoesNotExist(format!(
                    "Keypair ({}, {}) not found in escrow api",
                    keychain_uid, key_algo
                ))
            }
            other => other.into(),
        })
    }

    async fn get_message_signature(
        &self,
        kuid: KeychainUid,
        message: &[u8],
        signature_algo: SignatureAlgo,
    ) -> Result<Vec<u8>, CryptainerError> {
        if message.len() > MAX_PAYLOAD_LENGTH_FOR_SIGNATURE {
            return Err(CryptainerError::ValueError(
                "Message too big for signing, only a hash should be sent".to_string(),
            ));
        }
        let key_algo = KeyAlgo::from(signature_algo);
        let private_stored = self.inner.keystore.get_private_key(kuid, key_algo)?;
        let private = decrypt_private_key_with_passphrases(&private_stored, &[])?;
        Ok(signature_suite::sign(&private, signature_algo, message)?)
    }

    async fn request_decryption_authorization(
        &self,
        keypair_identifiers: &[KeypairIdentifier],
        request_message: &str,
        passphrases: &[String],
    ) -> Result<DecryptionAuthorizationResponse, CryptainerError> {
        self.inner.request_decryption_authorization(keypair_identifiers, request_message, passphrases).await
    }

    async fn decrypt_with_private_key(
        &self,
        kuid: KeychainUid,
        encryption_algo: AsymmetricCipherAlgo,
        cipherdict: &CipherBlob,
        passphrases: &[String],
    ) -> Result<Vec<u8>, CryptainerError> {
        self.inner.decrypt_with_private_key(kuid, encryption_algo, cipherdict, passphrases).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptainer_keystore::{InMemoryBackend, KeychainUid};

    fn trustee() -> LocalTrustee {
        LocalTrustee::new(Arc::new(Keystore::new(Arc::new(InMemoryBackend::new()))))
    }

    #[tokio::test]
    async fn fetch_public_key_autogenerates_when_missing() {
        let t = trustee();
        let kuid = KeychainUid::generate();
        let pk = t.fetch_public_key(kuid, KeyAlgo::RsaOaep, false).await.unwrap();
        assert!(!pk.is_empty());
    }

    #[tokio::test]
    async fn fetch_public_key_must_exist_fails_when_missing() {
        let t = trustee();
        let kuid = KeychainUid::generate();
        let err = t.fetch_public_key(kuid, KeyAlgo::RsaOaep, true).await.unwrap_err();
        assert!(matches!(err, CryptainerError::KeyDoesNotExist(_)));
    }

    #[tokio::test]
    async fn oversize_signature_input_is_rejected() {
        let t = trustee();
        let kuid = KeychainUid::generate();
        let huge = vec![0u8; MAX_PAYLOAD_LENGTH_FOR_SIGNATURE + 1];
        let err = t.get_message_signature(kuid, &huge, SignatureAlgo::DsaDss).await.unwrap_err();
        assert!(matches!(err, CryptainerError::ValueError(_)));
    }

    #[tokio::test]
    async fn sign_then_verify_via_fetched_public_key() {
        let t = trustee();
        let kuid = KeychainUid::generate();
        let digest = vec![7u8; 32];
        let sig = t.get_message_signature(kuid, &digest, SignatureAlgo::EccDss).await.unwrap();
        let pk = t.fetch_public_key(kuid, KeyAlgo::EccDss, true).await.unwrap();
        assert!(signature_suite::verify(&pk, &digest, &sig).is_ok());
    }

    #[tokio::test]
    async fn readonly_trustee_never_generates() {
        let rt = ReadonlyTrustee::new(Arc::new(Keystore::new(Arc::new(InMemoryBackend::new()))));
        let kuid = KeychainUid::generate();
        let err = rt.fetch_public_key(kuid, KeyAlgo::RsaOaep, false).await.unwrap_err();
        assert!(matches!(err, CryptainerError::KeyDoesNotExist(_)));
    }

    #[tokio::test]
    async fn wrong_passphrase_fails_to_decrypt_private_key() {
        let t = trustee();
        let kuid = KeychainUid::generate();
        t.generate_and_store_keypair(kuid, KeyAlgo::RsaOaep, Some("correct-horse")).unwrap();
        let pubkey = t.keystore.get_public_key(kuid, KeyAlgo::RsaOaep).unwrap();
        let cipherdict = cryptainer_crypto::asymmetric_cipher::wrap(
            AsymmetricCipherAlgo::RsaOaep,
            &pubkey,
            b"topsecret",
        )
        .unwrap();

        let err = t
            .decrypt_with_private_key(kuid, AsymmetricCipherAlgo::RsaOaep, &cipherdict, &["wrong".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, CryptainerError::DecryptionError(_)));

        let pt = t
            .decrypt_with_private_key(kuid, AsymmetricCipherAlgo::RsaOaep, &cipherdict, &["correct-horse".to_string()])
            .await
            .unwrap();
        assert_eq!(pt, b"topsecret");
    }
}
