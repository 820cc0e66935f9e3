//! `TrusteeDescriptor` (§3): identifies which authority holds or gates a
//! keypair. Its identity key is the canonical sorted-pairs tuple of its
//! fields, rendered as a Python-repr-style string
//! (`"[('trustee_type', 'local_factory')]"`) so dependency-analyzer output
//! and passphrase-mapper keys stay stable and debuggable (SPEC_FULL.md §3).

use std::fmt;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CryptainerError;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TrusteeDescriptor {
    LocalFactory,
    AuthDevice { keystore_uid: Uuid },
    JsonRpc { url: String },
}

impl TrusteeDescriptor {
    /// Canonical identity string: fields sorted by name, rendered as a
    /// Python-repr-style list of `(name, value)` pairs (SPEC_FULL.md §3).
    pub fn identity_key(&self) -> String {
        match self {
            Self::LocalFactory => "[('trustee_type', 'local_factory')]".to_string(),
            Self::AuthDevice { keystore_uid } => {
                format!("[('keystore_uid', '{}'), ('trustee_type', 'authdevice')]", keystore_uid)
            }
            Self::JsonRpc { url } => format!("[('trustee_type', 'jsonrpc'), ('url', '{}')]", url),
        }
    }
}

impl fmt::Display for TrusteeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity_key())
    }
}

impl Serialize for TrusteeDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::LocalFactory => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("trustee_type", "local_factory")?;
                map.end()
            }
            Self::AuthDevice { keystore_uid } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("trustee_type", "authdevice")?;
                map.serialize_entry("keystore_uid", keystore_uid)?;
                map.end()
            }
            Self::JsonRpc { url } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("trustee_type", "jsonrpc")?;
                map.serialize_entry("url", url)?;
                map.end()
            }
        }
    }
}

/// Custom `Deserialize` (rather than a derived adjacently-tagged enum) so
/// that the legacy `"key_device"` trustee-type string is rejected with a
/// specific `ValueError`-shaped message instead of a generic "unknown
/// variant" error — Open Question (a) in SPEC_FULL.md §9.
impl<'de> Deserialize<'de> for TrusteeDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TrusteeVisitor;

        impl<'de> Visitor<'de> for TrusteeVisitor {
            type Value = TrusteeDescriptor;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a trustee descriptor object, or the bare \"local_factory\" marker string")
            }

            /// Accepts the original fixtures' shorthand: the bare marker
            /// string in place of `{"trustee_type": "local_factory"}`.
            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                match v {
                    "local_factory" => Ok(TrusteeDescriptor::LocalFactory),
                    "key_device" => Err(de::Error::custom(
                        "unrecognized trustee_type: key_device (use authdevice)",
                    )),
                    other => Err(de::Error::custom(format!("unrecognized trustee marker: {}", other))),
                }
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut trustee_type: Option<String> = None;
                let mut keystore_uid: Option<Uuid> = None;
                let mut url: Option<String> = None;

                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "trustee_type" => trustee_type = Some(map.next_value()?),
                        "keystore_uid" => keystore_uid = Some(map.next_value()?),
                        "url" => url = Some(map.next_value()?),
                        _ => {
                            let _: serde::de::IgnoredAny = map.next_value()?;
                        }
                    }
                }

                let trustee_type = trustee_type.ok_or_else(|| de::Error::missing_field("trustee_type"))?;
                match trustee_type.as_str() {
                    "local_factory" => Ok(TrusteeDescriptor::LocalFactory),
                    "authdevice" => {
                        let keystore_uid =
                            keystore_uid.ok_or_else(|| de::Error::missing_field("keystore_uid"))?;
                        Ok(TrusteeDescriptor::AuthDevice { keystore_uid })
                    }
                    "jsonrpc" => {
                        let url = url.ok_or_else(|| de::Error::missing_field("url"))?;
                        Ok(TrusteeDescriptor::JsonRpc { url })
                    }
                    "key_device" => Err(de::Error::custom(
                        "unrecognized trustee_type: key_device (use authdevice)",
                    )),
                    other => Err(de::Error::custom(format!("unrecognized trustee_type: {}", other))),
                }
            }
        }

        deserializer.deserialize_any(TrusteeVisitor)
    }
}

impl TryFrom<&str> for TrusteeDescriptor {
    type Error = CryptainerError;

    /// Parses the bare marker string form (`LOCAL_FACTORY_TRUSTEE_MARKER`),
    /// the shorthand the original cryptoconf fixtures use in place of a
    /// full `{trustee_type: ...}` object.
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        if s == cryptainer_crypto::LOCAL_FACTORY_TRUSTEE_MARKER {
            Ok(Self::LocalFactory)
        } else {
            Err(CryptainerError::ValueError(format!("unrecognized trustee marker: {}", s)))
        }
    }
}
