//! JWK key-set model.
//!
//! Key sets are supplied by the secret-store collaborator, one set per
//! token use (ID Token, user info, request object). The token signer
//! selects the first key whose declared use matches; a key with no
//! declared use matches any.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::hash::HashAlgorithm;

/// JWS signature algorithms supported for token signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    RS256,
    /// RSASSA-PKCS1-v1_5 with SHA-384.
    RS384,
    /// RSASSA-PKCS1-v1_5 with SHA-512.
    RS512,
    /// ECDSA P-256 with SHA-256.
    ES256,
    /// ECDSA P-384 with SHA-384.
    ES384,
    /// HMAC with SHA-256.
    HS256,
    /// HMAC with SHA-384.
    HS384,
    /// HMAC with SHA-512.
    HS512,
}

/// Algorithm families, determining which signer implementation applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    /// RSA keys (PEM-encoded private key).
    Rsa,
    /// Elliptic-curve keys (PEM-encoded private key).
    EllipticCurve,
    /// Symmetric HMAC secrets.
    Hmac,
}

impl SignatureAlgorithm {
    /// The algorithm family.
    #[must_use]
    pub const fn family(self) -> KeyFamily {
        match self {
            Self::RS256 | Self::RS384 | Self::RS512 => KeyFamily::Rsa,
            Self::ES256 | Self::ES384 => KeyFamily::EllipticCurve,
            Self::HS256 | Self::HS384 | Self::HS512 => KeyFamily::Hmac,
        }
    }

    /// The digest width paired with this algorithm, used for `at_hash`.
    #[must_use]
    pub const fn hash_algorithm(self) -> HashAlgorithm {
        match self {
            Self::RS256 | Self::ES256 | Self::HS256 => HashAlgorithm::Sha256,
            Self::RS384 | Self::ES384 | Self::HS384 => HashAlgorithm::Sha384,
            Self::RS512 | Self::HS512 => HashAlgorithm::Sha512,
        }
    }

    /// JWA name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RS256" => Ok(Self::RS256),
            "RS384" => Ok(Self::RS384),
            "RS512" => Ok(Self::RS512),
            "ES256" => Ok(Self::ES256),
            "ES384" => Ok(Self::ES384),
            "HS256" => Ok(Self::HS256),
            "HS384" => Ok(Self::HS384),
            "HS512" => Ok(Self::HS512),
            other => Err(format!("unsupported signature algorithm: {other}")),
        }
    }
}

/// Declared use of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyUse {
    /// Signing.
    Sig,
    /// Encryption; present for completeness, never selected for signing.
    Enc,
}

/// Private key material. The `Debug` impl never prints the bytes.
#[derive(Clone, Serialize, Deserialize)]
pub enum KeyMaterial {
    /// PEM-encoded RSA private key.
    RsaPem(String),
    /// PEM-encoded EC private key.
    EcPem(String),
    /// Raw HMAC secret.
    Secret(Vec<u8>),
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = match self {
            Self::RsaPem(_) => "RsaPem",
            Self::EcPem(_) => "EcPem",
            Self::Secret(_) => "Secret",
        };
        write!(f, "KeyMaterial::{variant}([REDACTED])")
    }
}

/// A single signing key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    /// Key identifier, placed in the JWS header when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Signature algorithm this key is used with.
    pub alg: SignatureAlgorithm,

    /// Declared use; `None` matches any requested use.
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub usage: Option<KeyUse>,

    /// The private key material.
    pub material: KeyMaterial,
}

/// An ordered set of keys for one token use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JwkSet {
    /// Keys in preference order.
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Returns the first key eligible for the given use.
    ///
    /// A key with no declared use is treated as matching.
    #[must_use]
    pub fn first_for_use(&self, usage: KeyUse) -> Option<&Jwk> {
        self.keys
            .iter()
            .find(|k| k.usage.is_none() || k.usage == Some(usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret_key(kid: &str, usage: Option<KeyUse>) -> Jwk {
        Jwk {
            kid: Some(kid.to_string()),
            alg: SignatureAlgorithm::HS256,
            usage,
            material: KeyMaterial::Secret(b"secret".to_vec()),
        }
    }

    #[test]
    fn family_and_hash_width() {
        assert_eq!(SignatureAlgorithm::RS384.family(), KeyFamily::Rsa);
        assert_eq!(SignatureAlgorithm::ES256.family(), KeyFamily::EllipticCurve);
        assert_eq!(SignatureAlgorithm::HS512.family(), KeyFamily::Hmac);
        assert_eq!(
            SignatureAlgorithm::RS512.hash_algorithm(),
            HashAlgorithm::Sha512
        );
        assert_eq!(
            SignatureAlgorithm::ES384.hash_algorithm(),
            HashAlgorithm::Sha384
        );
    }

    #[test]
    fn algorithm_round_trips_through_name() {
        for alg in [
            SignatureAlgorithm::RS256,
            SignatureAlgorithm::ES384,
            SignatureAlgorithm::HS512,
        ] {
            assert_eq!(alg.as_str().parse::<SignatureAlgorithm>(), Ok(alg));
        }
        assert!("none".parse::<SignatureAlgorithm>().is_err());
    }

    #[test]
    fn first_for_use_prefers_order() {
        let set = JwkSet {
            keys: vec![
                secret_key("enc-key", Some(KeyUse::Enc)),
                secret_key("sig-key", Some(KeyUse::Sig)),
                secret_key("any-key", None),
            ],
        };
        let chosen = set.first_for_use(KeyUse::Sig).unwrap();
        assert_eq!(chosen.kid.as_deref(), Some("sig-key"));
    }

    #[test]
    fn undeclared_use_matches() {
        let set = JwkSet {
            keys: vec![secret_key("any-key", None)],
        };
        assert!(set.first_for_use(KeyUse::Sig).is_some());
        assert!(set.first_for_use(KeyUse::Enc).is_some());
    }

    #[test]
    fn empty_set_yields_nothing() {
        assert!(JwkSet::default().first_for_use(KeyUse::Sig).is_none());
    }

    #[test]
    fn debug_redacts_material() {
        let rendered = format!("{:?}", KeyMaterial::Secret(b"top".to_vec()));
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("top"));
    }
}
