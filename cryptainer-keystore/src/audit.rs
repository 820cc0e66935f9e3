//! Structured audit logging for keystore operations, via `tracing` rather
//! than a bespoke hash-chained sink — every mutating call emits one event
//! carrying `key_id` (when one applies), `key_algo`, `action`, `success`
//! (§4.A).

use tracing::info;

use crate::types::{KeyAlgo, KeychainUid};

#[derive(Clone, Copy, Debug)]
pub enum AuditAction {
    SetKeys,
    AddFreeKeypair,
    AttachFreeKeypair,
}

impl AuditAction {
    fn as_str(self) -> &'static str {
        match self {
            Self::SetKeys => "set_keys",
            Self::AddFreeKeypair => "add_free_keypair",
            Self::AttachFreeKeypair => "attach_free_keypair",
        }
    }
}

pub fn audit_event(action: AuditAction, kuid: Option<KeychainUid>, algo: KeyAlgo, success: bool) {
    match kuid {
        Some(kuid) => info!(
            key_id = %kuid,
            key_algo = algo.as_str(),
            action = action.as_str(),
            success,
            "keystore event"
        ),
        None => info!(
            key_algo = algo.as_str(),
            action = action.as_str(),
            success,
            "keystore event"
        ),
    }
}
