//! Filename convention (SPEC_FULL.md §4.H): output is `<original>.crypt`;
//! on a name collision, a zero-padded 3-digit incrementing suffix is
//! inserted (`<base>.NNN.crypt`), monotonically increasing within the
//! directory.
//!
//! Open Question (b), carried from the original (SPEC_FULL.md §9b): suffix
//! numbering is derived from a directory scan at claim time, so two
//! independent `CryptainerStorage` instances writing into the same
//! directory can race. A single instance serializes claims because the
//! dispatcher processes one enqueued item at a time before handing work to
//! a worker task.

use std::path::Path;

pub const CRYPTAINER_EXTENSION: &str = "crypt";

fn base_name(original_filename: &str) -> String {
    Path::new(original_filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(original_filename)
        .to_string()
}

/// Claim the next available `.crypt` filename for `original_filename` inside
/// `dir`, given `existing` (the directory's current `.crypt` stems, without
/// extension) — the 3-digit suffix form, not a plain `<base>.crypt` collision
/// check alone, since a concurrent writer may have already claimed the bare
/// name without yet appearing in a stale `existing` snapshot... in which case
/// the caller is expected to retry (single-writer-per-directory, §9b).
pub fn claim_name(original_filename: &str, existing: &[String]) -> String {
    let base = base_name(original_filename);
    let bare = format!("{}.{}", base, CRYPTAINER_EXTENSION);
    if !existing.contains(&bare) {
        return bare;
    }

    let mut suffix = 1u32;
    loop {
        let candidate = format!("{}.{:03}.{}", base, suffix, CRYPTAINER_EXTENSION);
        if !existing.contains(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_name_used_when_no_collision() {
        assert_eq!(claim_name("report.pdf", &[]), "report.crypt");
    }

    #[test]
    fn collision_gets_a_zero_padded_suffix() {
        let existing = vec!["report.crypt".to_string()];
        assert_eq!(claim_name("report.pdf", &existing), "report.001.crypt");
    }

    #[test]
    fn suffix_is_monotonically_increasing() {
        let existing = vec![
            "report.crypt".to_string(),
            "report.001.crypt".to_string(),
            "report.002.crypt".to_string(),
        ];
        assert_eq!(claim_name("report.pdf", &existing), "report.003.crypt");
    }

    #[test]
    fn extensionless_original_name_is_preserved_as_base() {
        assert_eq!(claim_name("report", &[]), "report.crypt");
    }
}
