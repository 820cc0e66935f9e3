//! Symmetric payload cipher providers behind the three `PayloadCipherAlgo` labels.
//!
//! `AES_CBC` is unauthenticated (PKCS#7-padded CBC). `AES_EAX` and
//! `CHACHA20_POLY1305` are authenticated: each is built as a CTR-mode stream
//! cipher plus an HMAC-SHA256 computed over the ciphertext (Encrypt-then-MAC),
//! rather than via the all-in-one `eax`/`chacha20poly1305` AEAD crates — those
//! crates fuse decryption and tag verification into one call, but
//! `decrypt(..., verify=false)` (§4.E, §8 scenario 6) must be able to recover
//! plaintext without checking the tag at all. CTR+HMAC is the standard
//! generic composition for exactly that shape and keeps every building block
//! (`aes`, `ctr`, `chacha20`, `hmac`, `sha2`) an audited RustCrypto crate; see
//! DESIGN.md for the full rationale.

use std::collections::HashMap;

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use chacha20::ChaCha20;
use cipher::{KeyIvInit as StreamKeyIvInit, StreamCipher};
use ctr::Ctr128BE;
use getrandom::getrandom;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::algos::PayloadCipherAlgo;
use crate::error::{DecryptionError, EncodingError};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type Aes256Ctr = Ctr128BE<Aes256>;
type HmacSha256 = Hmac<Sha256>;

pub const SYMMETRIC_KEY_BYTES: usize = 32;
const CBC_IV_BYTES: usize = 16;
const CTR_NONCE_BYTES: usize = 16;
const CHACHA_NONCE_BYTES: usize = 12;
const MAC_TAG_BYTES: usize = 32;

/// Result of encrypting one payload cipher layer.
pub struct SymmetricCiphertext {
    /// Nonce/IV prefixed to the raw ciphertext bytes.
    pub ciphertext: Vec<u8>,
    /// Authenticated-cipher tag(s); empty for unauthenticated algos.
    pub macs: HashMap<String, Vec<u8>>,
}

/// Generate a fresh symmetric key appropriate for `algo`.
pub fn generate_key(_algo: PayloadCipherAlgo) -> Result<Vec<u8>, EncodingError> {
    let mut key = vec![0u8; SYMMETRIC_KEY_BYTES];
    getrandom(&mut key).map_err(|_| EncodingError)?;
    Ok(key)
}

pub fn encrypt(
    algo: PayloadCipherAlgo,
    key: &[u8],
    plaintext: &[u8],
) -> Result<SymmetricCiphertext, EncodingError> {
    match algo {
        PayloadCipherAlgo::AesCbc => encrypt_cbc(key, plaintext),
        PayloadCipherAlgo::AesEax => encrypt_ctr_hmac::<Aes256Ctr>(key, plaintext, CTR_NONCE_BYTES),
        PayloadCipherAlgo::Chacha20Poly1305 => {
            encrypt_ctr_hmac::<ChaCha20>(key, plaintext, CHACHA_NONCE_BYTES)
        }
    }
}

pub fn decrypt(
    algo: PayloadCipherAlgo,
    key: &[u8],
    ct: &SymmetricCiphertext,
    verify: bool,
) -> Result<Vec<u8>, DecryptionError> {
    match algo {
        PayloadCipherAlgo::AesCbc => decrypt_cbc(key, &ct.ciphertext),
        PayloadCipherAlgo::AesEax => {
            decrypt_ctr_hmac::<Aes256Ctr>(key, ct, CTR_NONCE_BYTES, verify)
        }
        PayloadCipherAlgo::Chacha20Poly1305 => {
            decrypt_ctr_hmac::<ChaCha20>(key, ct, CHACHA_NONCE_BYTES, verify)
        }
    }
}

fn encrypt_cbc(key: &[u8], plaintext: &[u8]) -> Result<SymmetricCiphertext, EncodingError> {
    if key.len() != SYMMETRIC_KEY_BYTES {
        return Err(EncodingError);
    }
    let mut iv = [0u8; CBC_IV_BYTES];
    getrandom(&mut iv).map_err(|_| EncodingError)?;
    let enc = Aes256CbcEnc::new(key.into(), &iv.into());
    let body = enc.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut out = Vec::with_capacity(CBC_IV_BYTES + body.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&body);
    Ok(SymmetricCiphertext {
        ciphertext: out,
        macs: HashMap::new(),
    })
}

fn decrypt_cbc(key: &[u8], ct: &[u8]) -> Result<Vec<u8>, DecryptionError> {
    if key.len() != SYMMETRIC_KEY_BYTES || ct.len() < CBC_IV_BYTES {
        return Err(DecryptionError);
    }
    let (iv, body) = ct.split_at(CBC_IV_BYTES);
    let dec = Aes256CbcDec::new(key.into(), iv.into());
    dec.decrypt_padded_vec_mut::<Pkcs7>(body).map_err(|_| DecryptionError)
}

trait CtrStream: StreamCipher + Sized {
    fn build(key: &[u8], nonce: &[u8]) -> Result<Self, EncodingError>;
}

impl CtrStream for Aes256Ctr {
    fn build(key: &[u8], nonce: &[u8]) -> Result<Self, EncodingError> {
        if key.len() != SYMMETRIC_KEY_BYTES || nonce.len() != CTR_NONCE_BYTES {
            return Err(EncodingError);
        }
        Ok(Aes256Ctr::new(key.into(), nonce.into()))
    }
}

impl CtrStream for ChaCha20 {
    fn build(key: &[u8], nonce: &[u8]) -> Result<Self, EncodingError> {
        if key.len() != SYMMETRIC_KEY_BYTES || nonce.len() != CHACHA_NONCE_BYTES {
            return Err(EncodingError);
        }
        Ok(ChaCha20::new(key.into(), nonce.into()))
    }
}

fn mac_tag(key: &[u8], nonce: &[u8], ciphertext_body: &[u8]) -> Result<Vec<u8>, EncodingError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| EncodingError)?;
    mac.update(nonce);
    mac.update(ciphertext_body);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn encrypt_ctr_hmac<C: CtrStream>(
    key: &[u8],
    plaintext: &[u8],
    nonce_len: usize,
) -> Result<SymmetricCiphertext, EncodingError> {
    let mut nonce = vec![0u8; nonce_len];
    getrandom(&mut nonce).map_err(|_| EncodingError)?;
    let mut body = plaintext.to_vec();
    let mut cipher = C::build(key, &nonce)?;
    cipher.apply_keystream(&mut body);

    let tag = mac_tag(key, &nonce, &body)?;

    let mut out = Vec::with_capacity(nonce_len + body.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&body);

    let mut macs = HashMap::new();
    macs.insert("tag".to_string(), tag);
    Ok(SymmetricCiphertext {
        ciphertext: out,
        macs,
    })
}

fn decrypt_ctr_hmac<C: CtrStream>(
    key: &[u8],
    ct: &SymmetricCiphertext,
    nonce_len: usize,
    verify: bool,
) -> Result<Vec<u8>, DecryptionError> {
    if ct.ciphertext.len() < nonce_len {
        return Err(DecryptionError);
    }
    let (nonce, body) = ct.ciphertext.split_at(nonce_len);

    if verify {
        let tag = ct.macs.get("tag").ok_or(DecryptionError)?;
        if tag.len() != MAC_TAG_BYTES {
            return Err(DecryptionError);
        }
        let expected = mac_tag(key, nonce, body).map_err(|_| DecryptionError)?;
        if expected.ct_eq(tag).unwrap_u8() != 1 {
            return Err(DecryptionError);
        }
    }

    let mut plaintext = body.to_vec();
    let mut cipher = C::build(key, nonce).map_err(|_| DecryptionError)?;
    cipher.apply_keystream(&mut plaintext);
    Ok(plaintext)
}
