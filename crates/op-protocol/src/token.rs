//! Token signing.
//!
//! The signer resolves a key set per token use through the secret-store
//! collaborator, selects the first eligible key, and memoizes the
//! prepared key. Key selection failures are memoized too: a broken
//! configuration is surfaced once and not silently retried on every
//! call.

use std::sync::Arc;

use dashmap::DashMap;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;

use op_core::CoreError;
use op_crypto::hash::left_half;
use op_crypto::jwk::{JwkSet, KeyFamily, KeyMaterial, KeyUse, SignatureAlgorithm};

/// The token uses a key set can be configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKeyKind {
    /// ID Token signing.
    IdToken,
    /// User-info response signing.
    UserInfo,
    /// Request-object verification.
    RequestObject,
}

impl TokenKeyKind {
    /// The secret-store key-set name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IdToken => "idToken",
            Self::UserInfo => "userInfo",
            Self::RequestObject => "requestObject",
        }
    }
}

/// Supplies JWK sets per token use.
pub trait KeySource: Send + Sync {
    /// Returns the key set configured for the given use.
    fn jwk_set(&self, kind: TokenKeyKind) -> Result<JwkSet, CoreError>;
}

/// A selected key, ready to sign.
pub struct PreparedKey {
    /// Algorithm of the selected key.
    pub alg: SignatureAlgorithm,
    header: Header,
    key: EncodingKey,
}

impl std::fmt::Debug for PreparedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedKey")
            .field("alg", &self.alg)
            .field("kid", &self.header.kid)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone)]
enum CacheEntry {
    Ready(Arc<PreparedKey>),
    Failed(String),
}

/// Signs claim sets with keys selected by declared use.
pub struct TokenSigner {
    source: Arc<dyn KeySource>,
    cache: DashMap<TokenKeyKind, CacheEntry>,
}

impl TokenSigner {
    /// Creates a signer over the given key source.
    #[must_use]
    pub fn new(source: Arc<dyn KeySource>) -> Self {
        Self {
            source,
            cache: DashMap::new(),
        }
    }

    /// Returns the prepared key for a token use, selecting and caching
    /// it on first call.
    pub fn prepared(&self, kind: TokenKeyKind) -> Result<Arc<PreparedKey>, CoreError> {
        if let Some(entry) = self.cache.get(&kind) {
            return match entry.value().clone() {
                CacheEntry::Ready(key) => Ok(key),
                CacheEntry::Failed(message) => Err(CoreError::Signing(message)),
            };
        }
        let entry = match self.select(kind) {
            Ok(key) => CacheEntry::Ready(Arc::new(key)),
            Err(e) => {
                tracing::error!(kind = kind.as_str(), error = %e, "signing key selection failed");
                CacheEntry::Failed(e.to_string())
            }
        };
        self.cache.insert(kind, entry.clone());
        match entry {
            CacheEntry::Ready(key) => Ok(key),
            CacheEntry::Failed(message) => Err(CoreError::Signing(message)),
        }
    }

    fn select(&self, kind: TokenKeyKind) -> Result<PreparedKey, CoreError> {
        let set = self.source.jwk_set(kind)?;
        let jwk = set.first_for_use(KeyUse::Sig).ok_or_else(|| {
            CoreError::Signing(format!("no eligible signing key for {}", kind.as_str()))
        })?;

        let key = match (&jwk.material, jwk.alg.family()) {
            (KeyMaterial::RsaPem(pem), KeyFamily::Rsa) => EncodingKey::from_rsa_pem(pem.as_bytes())
                .map_err(|e| CoreError::Signing(e.to_string()))?,
            (KeyMaterial::EcPem(pem), KeyFamily::EllipticCurve) => {
                EncodingKey::from_ec_pem(pem.as_bytes())
                    .map_err(|e| CoreError::Signing(e.to_string()))?
            }
            (KeyMaterial::Secret(secret), KeyFamily::Hmac) => EncodingKey::from_secret(secret),
            (material, family) => {
                return Err(CoreError::Signing(format!(
                    "key material {material:?} does not match algorithm family {family:?}"
                )))
            }
        };

        let mut header = Header::new(jwt_algorithm(jwk.alg));
        header.kid.clone_from(&jwk.kid);
        Ok(PreparedKey {
            alg: jwk.alg,
            header,
            key,
        })
    }

    /// Signs a claim set into a compact JWS for the given token use.
    pub fn sign<T: Serialize>(&self, kind: TokenKeyKind, claims: &T) -> Result<String, CoreError> {
        let prepared = self.prepared(kind)?;
        jsonwebtoken::encode(&prepared.header, claims, &prepared.key)
            .map_err(|e| CoreError::Signing(e.to_string()))
    }
}

const fn jwt_algorithm(alg: SignatureAlgorithm) -> Algorithm {
    match alg {
        SignatureAlgorithm::RS256 => Algorithm::RS256,
        SignatureAlgorithm::RS384 => Algorithm::RS384,
        SignatureAlgorithm::RS512 => Algorithm::RS512,
        SignatureAlgorithm::ES256 => Algorithm::ES256,
        SignatureAlgorithm::ES384 => Algorithm::ES384,
        SignatureAlgorithm::HS256 => Algorithm::HS256,
        SignatureAlgorithm::HS384 => Algorithm::HS384,
        SignatureAlgorithm::HS512 => Algorithm::HS512,
    }
}

/// Computes the `at_hash` claim: the left half of a digest of the
/// access token, with the digest width matched to the signing
/// algorithm, base64url-encoded without padding.
#[must_use]
pub fn compute_at_hash(alg: SignatureAlgorithm, access_token: &str) -> String {
    let digest = alg.hash_algorithm().digest(access_token.as_bytes());
    base64::Engine::encode(
        &base64::engine::general_purpose::URL_SAFE_NO_PAD,
        left_half(&digest),
    )
}
