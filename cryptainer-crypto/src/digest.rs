//! Digest provider behind the four `DigestAlgo` labels.

use sha2::{Digest as _, Sha256, Sha512};
use sha3::{Sha3_256, Sha3_512};

use crate::algos::DigestAlgo;

/// Hash `data` under the named algorithm.
pub fn digest(algo: DigestAlgo, data: &[u8]) -> Vec<u8> {
    match algo {
        DigestAlgo::Sha256 => Sha256::digest(data).to_vec(),
        DigestAlgo::Sha512 => Sha512::digest(data).to_vec(),
        DigestAlgo::Sha3_256 => Sha3_256::digest(data).to_vec(),
        DigestAlgo::Sha3_512 => Sha3_512::digest(data).to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_matches_known_length() {
        let d = digest(DigestAlgo::Sha256, b"abc");
        assert_eq!(d.len(), 32);
    }

    #[test]
    fn sha3_512_matches_known_length() {
        let d = digest(DigestAlgo::Sha3_512, b"abc");
        assert_eq!(d.len(), 64);
    }

    #[test]
    fn distinct_algos_disagree() {
        let a = digest(DigestAlgo::Sha256, b"abc");
        let b = digest(DigestAlgo::Sha3_256, b"abc");
        assert_ne!(a, b);
    }

    /// Known-answer vectors for `b"abc"` under all four digest algorithms.
    #[test]
    fn known_answer_vectors_for_abc() {
        let cases = [
            (DigestAlgo::Sha256, "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"),
            (
                DigestAlgo::Sha512,
                "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39\
                 a2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f",
            ),
            (DigestAlgo::Sha3_256, "3a985da74fe225b2045c172d6bd390bd855f086e3e9d525b46bfe24511431532"),
            (
                DigestAlgo::Sha3_512,
                "b751850b1a57168a5693cd924b6b096e08f621827444f70d884f5d0240d2712\
                 e10e116e9192af3c91a7ec57647e3934057340b4cf408d5a56592f8274eec53f0",
            ),
        ];
        for (algo, expected_hex) in cases {
            assert_eq!(hex::encode(digest(algo, b"abc")), expected_hex);
        }
    }

    /// `SHA256("")` is the digest of the empty payload (§8 "including empty P").
    #[test]
    fn sha256_known_answer_for_empty_input() {
        let expected = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85";
        assert_eq!(hex::encode(digest(DigestAlgo::Sha256, b"")), expected);
    }
}
