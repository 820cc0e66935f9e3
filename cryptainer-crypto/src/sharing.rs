//! Shamir-style secret sharing behind the `SHARED_SECRET` key-cipher marker.
//!
//! Grounded in the pack's `aetherlight-core` Shamir wrapper (polynomial
//! interpolation over GF(256)), backed here by the `sharks` crate.

use sharks::{Share, Sharks};

use crate::error::DecryptionError;

/// Split `secret` into `shard_count` shards, any `threshold` of which recover it.
///
/// Returns shards in dense order 1..=shard_count, each independently
/// serialized so it can be stored/transmitted on its own.
pub fn split(secret: &[u8], threshold: u8, shard_count: u8) -> Vec<Vec<u8>> {
    let sharks = Sharks(threshold);
    sharks
        .dealer(secret)
        .take(shard_count as usize)
        .map(|share| Vec::from(&share))
        .collect()
}

/// Reconstitute the secret from a set of (possibly partial) serialized shards.
///
/// Fails with `DecryptionError` if fewer than `threshold` valid shards are
/// present, or if the shards do not agree on a polynomial. Callers
/// (the decryptor, §4.E) are responsible for reporting exactly how many
/// shards were short of the threshold; this function only reports success
/// or failure for the set handed to it.
pub fn recover(threshold: u8, shards: &[Vec<u8>]) -> Result<Vec<u8>, DecryptionError> {
    let sharks = Sharks(threshold);
    let parsed: Result<Vec<Share>, _> = shards
        .iter()
        .map(|bytes| Share::try_from(bytes.as_slice()))
        .collect();
    let parsed = parsed.map_err(|_| DecryptionError)?;
    sharks.recover(parsed.as_slice()).map_err(|_| DecryptionError)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_set_recovers() {
        let secret = b"abc".to_vec();
        let shards = split(&secret, 3, 5);
        assert_eq!(shards.len(), 5);
        let recovered = recover(3, &shards).unwrap();
        assert_eq!(recovered, secret);
    }

    #[test]
    fn exact_threshold_recovers() {
        let secret = b"threshold test payload".to_vec();
        let shards = split(&secret, 3, 5);
        let subset = vec![shards[0].clone(), shards[2].clone(), shards[4].clone()];
        let recovered = recover(3, &subset).unwrap();
        assert_eq!(recovered, secret);
    }

    #[test]
    fn below_threshold_fails() {
        let secret = b"abc".to_vec();
        let shards = split(&secret, 3, 5);
        let subset = vec![shards[0].clone(), shards[1].clone()];
        assert!(recover(3, &subset).is_err());
    }
}
