//! Message digests.

use crate::algorithm::DigestAlgorithm;
use crate::error::CryptoResult;

/// Computes a digest of the input data.
///
/// # Errors
///
/// Returns an error if OpenSSL rejects the digest.
pub fn hash(algorithm: DigestAlgorithm, data: &[u8]) -> CryptoResult<Vec<u8>> {
    let digest = openssl::hash::hash(algorithm.message_digest(), data)?;
    Ok(digest.to_vec())
}

/// Formats a digest as colon separated upper-case hex pairs (`AB:CD:...`).
#[must_use]
pub fn colon_hex(digest: &[u8]) -> String {
    hex::encode_upper(digest)
        .as_bytes()
        .chunks(2)
        .filter_map(|pair| std::str::from_utf8(pair).ok())
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digests_have_expected_lengths() {
        for alg in [
            DigestAlgorithm::Sha1,
            DigestAlgorithm::Sha256,
            DigestAlgorithm::Sha384,
            DigestAlgorithm::Sha512,
        ] {
            assert_eq!(hash(alg, b"test").unwrap().len(), alg.output_len());
        }
    }

    #[test]
    fn sha1_known_value() {
        let digest = hash(DigestAlgorithm::Sha1, b"abc").unwrap();
        assert_eq!(hex::encode(digest), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn colon_hex_pairs() {
        assert_eq!(colon_hex(&[0xab, 0x01, 0xff]), "AB:01:FF");
        assert_eq!(colon_hex(&[]), "");
    }
}
