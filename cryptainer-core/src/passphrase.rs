//! Passphrase mapper (§4.E): a caller-supplied map from trustee identity to
//! candidate passphrases, consulted by the decryptor when unwrapping a
//! private key. The wildcard entry (Rust's `None`, not a sentinel string)
//! applies to every trustee in addition to its own specific entry.

use std::collections::HashMap;

use crate::trustee_id::TrusteeDescriptor;

#[derive(Clone, Debug, Default)]
pub struct PassphraseMapper {
    candidates: HashMap<Option<TrusteeDescriptor>, Vec<String>>,
}

impl PassphraseMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Candidate passphrases for `trustee`: the wildcard entry first, then
    /// the trustee-specific entry. The raw-key case ("no passphrase at all")
    /// is always tried first by the trustee regardless of this list, so an
    /// empty mapper still decrypts unprotected keys.
    pub fn set_passphrases(&mut self, trustee: Option<TrusteeDescriptor>, passphrases: Vec<String>) {
        self.candidates.insert(trustee, passphrases);
    }

    pub fn passphrases_for(&self, trustee: &TrusteeDescriptor) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(wildcard) = self.candidates.get(&None) {
            out.extend(wildcard.iter().cloned());
        }
        if let Some(specific) = self.candidates.get(&Some(trustee.clone())) {
            out.extend(specific.iter().cloned());
        }
        out
    }
}
