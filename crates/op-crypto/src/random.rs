//! Cryptographically secure random generation.
//!
//! Used for correlation ids, opaque bearer tokens and the log keys
//! attached to server-error responses.

use rand::distr::{Alphanumeric, SampleString};
use rand::Rng;

/// Generates `len` cryptographically secure random bytes.
#[must_use]
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut rng = rand::rng();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes[..]);
    bytes
}

/// Generates a random alphanumeric string of `len` characters.
#[must_use]
pub fn random_alphanumeric(len: usize) -> String {
    let mut rng = rand::rng();
    Alphanumeric.sample_string(&mut rng, len)
}

/// Generates a URL-safe base64 string from `byte_len` random bytes.
///
/// 32 bytes give 256 bits of entropy, the floor for correlation ids and
/// opaque access tokens.
#[must_use]
pub fn random_base64url(byte_len: usize) -> String {
    let bytes = random_bytes(byte_len);
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}

/// Generates a short random key for cross-referencing error responses
/// with server logs.
#[must_use]
pub fn random_log_key() -> String {
    random_alphanumeric(12)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn random_bytes_produces_correct_length() {
        assert_eq!(random_bytes(16).len(), 16);
        assert_eq!(random_bytes(32).len(), 32);
    }

    #[test]
    fn random_bytes_produces_different_values() {
        assert_ne!(random_bytes(32), random_bytes(32));
    }

    #[test]
    fn random_alphanumeric_only_contains_valid_chars() {
        let s = random_alphanumeric(1000);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn random_base64url_no_special_chars() {
        let s = random_base64url(32);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn random_base64url_uniqueness() {
        let ids: HashSet<String> = (0..1000).map(|_| random_base64url(32)).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn log_key_length() {
        assert_eq!(random_log_key().len(), 12);
    }
}
