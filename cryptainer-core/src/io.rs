//! Cryptainer I/O (component F, SPEC_FULL.md §4.F): serializing a cryptainer
//! to/from the filesystem, optionally offloading the payload ciphertext to a
//! sidecar `.payload` file.
//!
//! The on-disk format is plain `serde_json` — `Cryptainer`'s `Vec<u8>` fields
//! already serialize as JSON number arrays, which already round-trips
//! losslessly through a generic `serde_json::Value` tree (the "raw JSON
//! tree" transformation schema validation needs, §6), so no extended-scalar
//! tagging layer is needed on top of what `serde`/`uuid`/`serde_json`
//! already provide.

use std::path::{Path, PathBuf};

use cryptainer_crypto::CRYPTAINER_TEMP_SUFFIX;

use crate::cryptoconf::{Cryptainer, PayloadCiphertextStruct};
use crate::error::CryptainerError;

const PAYLOAD_SIDECAR_SUFFIX: &str = ".payload";

fn sidecar_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(PAYLOAD_SIDECAR_SUFFIX);
    PathBuf::from(s)
}

/// Write `cryptainer` to `path`. When `offload_payload_ciphertext` is set,
/// the inline ciphertext bytes are swapped for the `[OFFLOADED]` marker and
/// written instead to `path.payload`; otherwise the whole tree lands in one
/// file.
pub fn dump(
    path: &Path,
    cryptainer: &Cryptainer,
    offload_payload_ciphertext: bool,
) -> Result<(), CryptainerError> {
    if offload_payload_ciphertext {
        let ciphertext = match &cryptainer.payload_ciphertext_struct {
            PayloadCiphertextStruct::Inline { ciphertext_value } => ciphertext_value.clone(),
            PayloadCiphertextStruct::Offloaded(_) => {
                return Err(CryptainerError::ConfigurationError(
                    "cryptainer is already offloaded; nothing to offload".to_string(),
                ))
            }
        };
        let mut header = cryptainer.clone();
        header.payload_ciphertext_struct = PayloadCiphertextStruct::offloaded_marker();
        std::fs::write(sidecar_path(path), &ciphertext)?;
        write_header(path, &header)
    } else {
        write_header(path, cryptainer)
    }
}

/// Write `header` through a temp-suffix-then-rename so readers never observe
/// a partially-written cryptainer file (SPEC_FULL.md §5). `pub(crate)` so the
/// streaming encryptor can publish its STARTED placeholder the same way.
pub(crate) fn write_header(path: &Path, header: &Cryptainer) -> Result<(), CryptainerError> {
    let bytes = serde_json::to_vec_pretty(header)?;
    let tmp_path = {
        let mut s = path.as_os_str().to_owned();
        s.push(CRYPTAINER_TEMP_SUFFIX);
        PathBuf::from(s)
    };
    std::fs::write(&tmp_path, &bytes)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Read a cryptainer from `path`. If `include_payload_ciphertext` is false,
/// the `payload_ciphertext_struct` field is stripped (set to the offloaded
/// marker) without touching any sidecar file, mirroring the original's
/// "header-only load" mode used for inspection/sanity checks.
pub fn load(path: &Path, include_payload_ciphertext: bool) -> Result<Cryptainer, CryptainerError> {
    let bytes = std::fs::read(path)?;
    let mut cryptainer: Cryptainer = serde_json::from_slice(&bytes)?;

    if !include_payload_ciphertext {
        cryptainer.payload_ciphertext_struct = PayloadCiphertextStruct::offloaded_marker();
        return Ok(cryptainer);
    }

    if cryptainer.payload_ciphertext_struct.is_offloaded() {
        let ciphertext = std::fs::read(sidecar_path(path))?;
        cryptainer.payload_ciphertext_struct =
            PayloadCiphertextStruct::Inline { ciphertext_value: ciphertext };
    }

    Ok(cryptainer)
}

/// Remove both the cryptainer file and its sidecar (if any). Missing files
/// are not an error — `delete` is idempotent.
pub fn delete(path: &Path) -> Result<(), CryptainerError> {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    match std::fs::remove_file(sidecar_path(path)) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Total on-disk size of a cryptainer: the header file plus its sidecar, if any.
pub fn total_size(path: &Path) -> std::io::Result<u64> {
    let mut total = std::fs::metadata(path)?.len();
    if let Ok(meta) = std::fs::metadata(sidecar_path(path)) {
        total += meta.len();
    }
    Ok(total)
}
