//! Digest helpers.
//!
//! The `at_hash` ID Token claim is the left half of a digest of the
//! access token, with the digest width matched to the signing
//! algorithm. These helpers cover the three widths in use.

use aws_lc_rs::digest;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// SHA-256.
    Sha256,
    /// SHA-384.
    Sha384,
    /// SHA-512.
    Sha512,
}

impl HashAlgorithm {
    const fn algorithm(self) -> &'static digest::Algorithm {
        match self {
            Self::Sha256 => &digest::SHA256,
            Self::Sha384 => &digest::SHA384,
            Self::Sha512 => &digest::SHA512,
        }
    }

    /// Digest output length in bytes.
    #[must_use]
    pub const fn output_len(self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Computes the digest of `data`.
    #[must_use]
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        digest::digest(self.algorithm(), data).as_ref().to_vec()
    }
}

/// Returns the left half of a digest.
#[must_use]
pub fn left_half(digest: &[u8]) -> &[u8] {
    &digest[..digest.len() / 2]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_lengths() {
        assert_eq!(HashAlgorithm::Sha256.digest(b"abc").len(), 32);
        assert_eq!(HashAlgorithm::Sha384.digest(b"abc").len(), 48);
        assert_eq!(HashAlgorithm::Sha512.digest(b"abc").len(), 64);
    }

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(
            HashAlgorithm::Sha256.digest(b"token"),
            HashAlgorithm::Sha256.digest(b"token")
        );
    }

    #[test]
    fn left_half_halves() {
        let d = HashAlgorithm::Sha512.digest(b"abc");
        assert_eq!(left_half(&d).len(), 32);
        assert_eq!(left_half(&d), &d[..32]);
    }

    #[test]
    fn sha256_known_vector() {
        // SHA-256("abc"), first four bytes.
        let d = HashAlgorithm::Sha256.digest(b"abc");
        assert_eq!(&d[..4], &[0xba, 0x78, 0x16, 0xbf]);
    }
}
