//! Algorithm name enumerations (the wire labels a cryptoconf/cryptainer can name).
//!
//! Labels are deliberately decoupled from implementations: a label picks a
//! concrete provider in this crate, but several labels may alias to the same
//! provider (see `signature.rs`, `asymmetric.rs`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Symmetric payload cipher, applied directly to plaintext/ciphertext.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadCipherAlgo {
    #[serde(rename = "AES_CBC")]
    AesCbc,
    #[serde(rename = "AES_EAX")]
    AesEax,
    #[serde(rename = "CHACHA20_POLY1305")]
    Chacha20Poly1305,
}

impl PayloadCipherAlgo {
    /// The authenticated subset: these algos produce a MAC tag.
    pub fn is_authenticated(self) -> bool {
        matches!(self, Self::AesEax | Self::Chacha20Poly1305)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AesCbc => "AES_CBC",
            Self::AesEax => "AES_EAX",
            Self::Chacha20Poly1305 => "CHACHA20_POLY1305",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "AES_CBC" => Some(Self::AesCbc),
            "AES_EAX" => Some(Self::AesEax),
            "CHACHA20_POLY1305" => Some(Self::Chacha20Poly1305),
            _ => None,
        }
    }
}

impl fmt::Display for PayloadCipherAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Asymmetric key-wrapping cipher. Only one label exists upstream
/// (`RSA_OAEP`); see `asymmetric.rs` for the concrete provider it resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AsymmetricCipherAlgo {
    #[serde(rename = "RSA_OAEP")]
    RsaOaep,
}

impl AsymmetricCipherAlgo {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RsaOaep => "RSA_OAEP",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "RSA_OAEP" => Some(Self::RsaOaep),
            _ => None,
        }
    }
}

impl fmt::Display for AsymmetricCipherAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signature algorithm. All three labels route to one Ed25519 provider
/// (see `signature.rs`) — the label distinguishes wire metadata, not the
/// implementation, the same aliasing shape the KEM layer already uses for
/// its own legacy label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgo {
    #[serde(rename = "DSA_DSS")]
    DsaDss,
    #[serde(rename = "RSA_PSS")]
    RsaPss,
    #[serde(rename = "ECC_DSS")]
    EccDss,
}

impl SignatureAlgo {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DsaDss => "DSA_DSS",
            Self::RsaPss => "RSA_PSS",
            Self::EccDss => "ECC_DSS",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "DSA_DSS" => Some(Self::DsaDss),
            "RSA_PSS" => Some(Self::RsaPss),
            "ECC_DSS" => Some(Self::EccDss),
            _ => None,
        }
    }
}

impl fmt::Display for SignatureAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Digest algorithm used for pre-signature hashing and content addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgo {
    #[serde(rename = "SHA256")]
    Sha256,
    #[serde(rename = "SHA512")]
    Sha512,
    #[serde(rename = "SHA3_256")]
    Sha3_256,
    #[serde(rename = "SHA3_512")]
    Sha3_512,
}

impl DigestAlgo {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
            Self::Sha3_256 => "SHA3_256",
            Self::Sha3_512 => "SHA3_512",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "SHA256" => Some(Self::Sha256),
            "SHA512" => Some(Self::Sha512),
            "SHA3_256" => Some(Self::Sha3_256),
            "SHA3_512" => Some(Self::Sha3_512),
            _ => None,
        }
    }
}

impl fmt::Display for DigestAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable marker strings that must round-trip across cryptainer files (§6).
pub const LOCAL_FACTORY_TRUSTEE_MARKER: &str = "local_factory";
pub const SHARED_SECRET_ALGO_MARKER: &str = "SHARED_SECRET";
pub const OFFLOADED_PAYLOAD_CIPHERTEXT_MARKER: &str = "[OFFLOADED]";
pub const CRYPTAINER_TEMP_SUFFIX: &str = ".tmp";
pub const CRYPTAINER_FORMAT: &str = "cryptainer_1.0";
