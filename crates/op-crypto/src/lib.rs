//! Cryptographic building blocks for the OpenID provider.
//!
//! Random value generation, digest helpers for `at_hash` computation,
//! the JWK key-set model used for token signing, and the detached
//! request signer used to authenticate against the external
//! authenticator node.

pub mod hash;
pub mod jwk;
pub mod random;
pub mod signing;

pub use hash::HashAlgorithm;
pub use jwk::{Jwk, JwkSet, KeyFamily, KeyMaterial, KeyUse, SignatureAlgorithm};
pub use signing::{CryptoError, NodeSignatureAlgorithm, RequestSigner};
