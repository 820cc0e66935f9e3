//! Core types: `KeychainUid`, `KeyAlgo`, `KeyMaterial`, `AuthDeviceKeystoreUid`.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cryptainer_crypto::{AsymmetricCipherAlgo, SignatureAlgo};

/// The keychain a keypair belongs to. One cryptainer has one default
/// keychain_uid; individual layers may override it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KeychainUid(pub Uuid);

impl KeychainUid {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for KeychainUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The UID of an imported authdevice keystore (§3, trustee identity).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthDeviceKeystoreUid(pub Uuid);

impl fmt::Display for AuthDeviceKeystoreUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Any algorithm that needs a keypair in the keystore: either the one
/// asymmetric key-wrapping cipher, or one of the three (aliased) signature
/// labels. Payload ciphers and digests have no keystore footprint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyAlgo {
    #[serde(rename = "RSA_OAEP")]
    RsaOaep,
    #[serde(rename = "DSA_DSS")]
    DsaDss,
    #[serde(rename = "RSA_PSS")]
    RsaPss,
    #[serde(rename = "ECC_DSS")]
    EccDss,
}

/// Deterministic ordinal used to break ties when the free-key generator
/// picks "the algo with the smallest free count" (§4.A).
pub const KEY_ALGOS_BY_ORDINAL: [KeyAlgo; 4] = [
    KeyAlgo::RsaOaep,
    KeyAlgo::DsaDss,
    KeyAlgo::RsaPss,
    KeyAlgo::EccDss,
];

impl KeyAlgo {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RsaOaep => "RSA_OAEP",
            Self::DsaDss => "DSA_DSS",
            Self::RsaPss => "RSA_PSS",
            Self::EccDss => "ECC_DSS",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "RSA_OAEP" => Some(Self::RsaOaep),
            "DSA_DSS" => Some(Self::DsaDss),
            "RSA_PSS" => Some(Self::RsaPss),
            "ECC_DSS" => Some(Self::EccDss),
            _ => None,
        }
    }

    /// Generate a fresh (public, private) keypair for this algo.
    pub fn generate_keypair(self) -> (Vec<u8>, Vec<u8>) {
        match self {
            Self::RsaOaep => cryptainer_crypto::asymmetric_cipher::generate_keypair(
                AsymmetricCipherAlgo::RsaOaep,
            ),
            Self::DsaDss => cryptainer_crypto::signature_suite::generate_keypair(),
            Self::RsaPss => cryptainer_crypto::signature_suite::generate_keypair(),
            Self::EccDss => cryptainer_crypto::signature_suite::generate_keypair(),
        }
    }

    /// Ordinal used for deterministic tie-breaking (§4.A).
    pub fn ordinal(self) -> usize {
        KEY_ALGOS_BY_ORDINAL.iter().position(|a| *a == self).unwrap()
    }
}

impl fmt::Display for KeyAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<AsymmetricCipherAlgo> for KeyAlgo {
    fn from(_: AsymmetricCipherAlgo) -> Self {
        KeyAlgo::RsaOaep
    }
}

impl From<SignatureAlgo> for KeyAlgo {
    fn from(algo: SignatureAlgo) -> Self {
        match algo {
            SignatureAlgo::DsaDss => KeyAlgo::DsaDss,
            SignatureAlgo::RsaPss => KeyAlgo::RsaPss,
            SignatureAlgo::EccDss => KeyAlgo::EccDss,
        }
    }
}

/// A keypair's raw serialized material.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyMaterial {
    pub public: Vec<u8>,
    pub private: Vec<u8>,
}
