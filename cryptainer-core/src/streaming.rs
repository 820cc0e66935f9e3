//! Streaming encryption variant (SPEC_FULL.md §4.D "Streaming variant", §9).
//!
//! `CryptainerEncryptionStream` is only offered for cryptoconfs that pass
//! `is_cryptainer_cryptoconf_streamable`: no payload signature can be
//! computed before the whole ciphertext exists, so a signed layer forbids
//! streaming outright.
//!
//! Simplification (documented in DESIGN.md): the narrow cipher interface in
//! `cryptainer-crypto` (§6.A) only exposes one-shot `encrypt`/`decrypt`, not
//! an incremental cipher state. `encrypt_chunk` therefore buffers plaintext
//! in memory and the real symmetric/asymmetric encryption work happens at
//! `finalize`, exactly as the non-streaming path does. What *is* genuinely
//! incremental is the filesystem side: the STARTED header is published
//! immediately on `start`, and `finalize` is the only step that writes
//! ciphertext and flips the cryptainer to FINISHED, via the same
//! temp-suffix-then-rename publication every other cryptainer write uses.

use std::path::PathBuf;

use uuid::Uuid;

use cryptainer_keystore::KeychainUid;

use crate::cryptoconf::{Cryptainer, CryptainerState, Cryptoconf, PayloadCiphertextStruct};
use crate::encryptor::{is_cryptainer_cryptoconf_streamable, CryptainerEncryptor};
use crate::error::CryptainerError;
use crate::registry::TrusteeRegistry;

pub struct CryptainerEncryptionStream<'a> {
    registry: &'a TrusteeRegistry,
    cryptoconf: Cryptoconf,
    keychain_uid: KeychainUid,
    cryptainer_uid: Uuid,
    cryptainer_metadata: Option<serde_json::Value>,
    header_path: PathBuf,
    buffer: Vec<u8>,
}

impl<'a> CryptainerEncryptionStream<'a> {
    /// Begin a streaming encryption. If `dump_initial_cryptainer` is set, a
    /// STARTED placeholder header (no ciphertext, no key material) is
    /// published to `header_path` immediately so a concurrent reader can
    /// observe that the write is in flight.
    pub fn start(
        registry: &'a TrusteeRegistry,
        header_path: PathBuf,
        cryptoconf: Cryptoconf,
        keychain_uid: Option<KeychainUid>,
        cryptainer_metadata: Option<serde_json::Value>,
        dump_initial_cryptainer: bool,
    ) -> Result<Self, CryptainerError> {
        if cryptoconf.payload_cipher_layers.is_empty() {
            return Err(CryptainerError::ConfigurationError(
                "cryptoconf must contain at least one payload_cipher_layer".to_string(),
            ));
        }
        if !is_cryptainer_cryptoconf_streamable(&cryptoconf) {
            return Err(CryptainerError::ConfigurationError(
                "cryptoconf is not streamable: a payload signature needs the full ciphertext".to_string(),
            ));
        }

        let keychain_uid = keychain_uid.unwrap_or_else(KeychainUid::generate);
        let cryptainer_uid = Uuid::new_v4();

        let stream = Self {
            registry,
            cryptoconf,
            keychain_uid,
            cryptainer_uid,
            cryptainer_metadata,
            header_path,
            buffer: Vec::new(),
        };

        if dump_initial_cryptainer {
            let placeholder = Cryptainer {
                cryptainer_uid: stream.cryptainer_uid,
                cryptainer_format: cryptainer_crypto::CRYPTAINER_FORMAT.to_string(),
                cryptainer_state: CryptainerState::Started,
                keychain_uid: stream.keychain_uid,
                cryptainer_metadata: stream.cryptainer_metadata.clone(),
                payload_ciphertext_struct: PayloadCiphertextStruct::offloaded_marker(),
                payload_cipher_layers: stream.cryptoconf.payload_cipher_layers.clone(),
            };
            crate::io::write_header(&stream.header_path, &placeholder)?;
        }

        Ok(stream)
    }

    /// Append `chunk` to the buffered plaintext (see module docs for why
    /// this is buffered rather than truly incremental).
    pub fn encrypt_chunk(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Run the full encryption pipeline over the assembled plaintext, write
    /// the final ciphertext to the offloaded sidecar, and atomically publish
    /// the FINISHED header at `header_path`.
    pub async fn finalize(self) -> Result<Cryptainer, CryptainerError> {
        let encryptor = CryptainerEncryptor::new(self.registry);
        let cryptainer = encryptor
            .encrypt(&self.cryptoconf, &self.buffer, Some(self.keychain_uid), self.cryptainer_metadata)
            .await?;
        crate::io::dump(&self.header_path, &cryptainer, true)?;
        Ok(cryptainer)
    }
}
