//! Detached request signing for the external authenticator node.
//!
//! Outbound registration calls are authenticated by signing the
//! canonical byte sequence `node-id bytes || nonce || body` with the
//! node's private key and sending the signature in an authorization
//! header.

use std::str::FromStr;

use aws_lc_rs::rand::SystemRandom;
use aws_lc_rs::signature::{Ed25519KeyPair, KeyPair as _, RsaKeyPair, RSA_PKCS1_SHA256};
use thiserror::Error;

/// Errors from key loading or signing.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The private key could not be parsed.
    #[error("invalid private key: {0}")]
    InvalidKey(String),

    /// The signing operation itself failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// The configured algorithm name is not recognized.
    #[error("unsupported node signature algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// Signature algorithms accepted for node authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeSignatureAlgorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    RsaSha256,
    /// Ed25519.
    Ed25519,
}

impl FromStr for NodeSignatureAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SHA256withRSA" | "RSA_SHA256" => Ok(Self::RsaSha256),
            "Ed25519" | "EdDSA" => Ok(Self::Ed25519),
            other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

enum SigningKey {
    Rsa(RsaKeyPair),
    Ed25519(Ed25519KeyPair),
}

/// Signs canonical request bytes with the node's private key.
pub struct RequestSigner {
    key: SigningKey,
    rng: SystemRandom,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.key {
            SigningKey::Rsa(_) => "Rsa",
            SigningKey::Ed25519(_) => "Ed25519",
        };
        write!(f, "RequestSigner({kind})")
    }
}

impl RequestSigner {
    /// Loads a signer from a PKCS#8 DER private key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKey`] when the DER document does
    /// not contain a key of the expected algorithm.
    pub fn from_pkcs8(algorithm: NodeSignatureAlgorithm, der: &[u8]) -> Result<Self, CryptoError> {
        let key = match algorithm {
            NodeSignatureAlgorithm::RsaSha256 => RsaKeyPair::from_pkcs8(der)
                .map(SigningKey::Rsa)
                .map_err(|e| CryptoError::InvalidKey(e.to_string()))?,
            NodeSignatureAlgorithm::Ed25519 => Ed25519KeyPair::from_pkcs8(der)
                .map(SigningKey::Ed25519)
                .map_err(|e| CryptoError::InvalidKey(e.to_string()))?,
        };
        Ok(Self {
            key,
            rng: SystemRandom::new(),
        })
    }

    /// Signs `data`, returning the raw signature bytes.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match &self.key {
            SigningKey::Rsa(key) => {
                let mut signature = vec![0u8; key.public_modulus_len()];
                key.sign(&RSA_PKCS1_SHA256, &self.rng, data, &mut signature)
                    .map_err(|e| CryptoError::Signing(e.to_string()))?;
                Ok(signature)
            }
            SigningKey::Ed25519(key) => Ok(key.sign(data).as_ref().to_vec()),
        }
    }
}

/// Builds the canonical byte sequence that gets signed: the node id,
/// the nonce and the request body, concatenated without separators.
#[must_use]
pub fn canonical_signing_input(node_id: &str, nonce: &str, body: &[u8]) -> Vec<u8> {
    let mut input = Vec::with_capacity(node_id.len() + nonce.len() + body.len());
    input.extend_from_slice(node_id.as_bytes());
    input.extend_from_slice(nonce.as_bytes());
    input.extend_from_slice(body);
    input
}

/// Formats the authorization header carrying a node signature:
/// `Node <node-id> <nonce>:<base64 signature>`.
#[must_use]
pub fn authorization_header(node_id: &str, nonce: &str, signature: &[u8]) -> String {
    let encoded =
        base64::Engine::encode(&base64::engine::general_purpose::STANDARD, signature);
    format!("Node {node_id} {nonce}:{encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_input_concatenates() {
        let input = canonical_signing_input("node-1", "1700000000", b"{}");
        assert_eq!(input, b"node-11700000000{}");
    }

    #[test]
    fn header_format() {
        let header = authorization_header("node-1", "42", &[0, 1, 2]);
        assert_eq!(header, "Node node-1 42:AAEC");
    }

    #[test]
    fn algorithm_names_parse() {
        assert_eq!(
            "SHA256withRSA".parse::<NodeSignatureAlgorithm>().unwrap(),
            NodeSignatureAlgorithm::RsaSha256
        );
        assert_eq!(
            "Ed25519".parse::<NodeSignatureAlgorithm>().unwrap(),
            NodeSignatureAlgorithm::Ed25519
        );
        assert!("DSA".parse::<NodeSignatureAlgorithm>().is_err());
    }

    #[test]
    fn ed25519_sign_round_trip() {
        let rng = SystemRandom::new();
        let doc = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
        let signer =
            RequestSigner::from_pkcs8(NodeSignatureAlgorithm::Ed25519, doc.as_ref()).unwrap();

        let input = canonical_signing_input("node-1", "1700000000", b"payload");
        let signature = signer.sign(&input).unwrap();
        assert_eq!(signature.len(), 64);

        // Verify against the public key to prove the signature is real.
        let key = Ed25519KeyPair::from_pkcs8(doc.as_ref()).unwrap();
        let public =
            aws_lc_rs::signature::UnparsedPublicKey::new(&aws_lc_rs::signature::ED25519, {
                key.public_key().as_ref().to_vec()
            });
        assert!(public.verify(&input, &signature).is_ok());
    }

    #[test]
    fn garbage_key_is_rejected() {
        let err = RequestSigner::from_pkcs8(NodeSignatureAlgorithm::RsaSha256, b"not a key");
        assert!(matches!(err, Err(CryptoError::InvalidKey(_))));
    }
}
