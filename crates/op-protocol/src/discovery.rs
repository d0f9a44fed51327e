//! Provider discovery metadata.
//!
//! The OpenID Provider configuration document served at
//! `.well-known/openid-configuration`, per OpenID Connect Discovery
//! 1.0. Only fields this provider actually supports are advertised;
//! unset fields and empty lists stay off the wire.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use url::Url;

use op_crypto::jwk::{JwkSet, KeyUse};

use crate::types::{ResponseMode, ResponseType, SubjectType};

/// The OpenID Provider configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Issuer identifier, identical to the `iss` claim in issued
    /// ID Tokens.
    pub issuer: Url,

    /// The authorization endpoint.
    pub authorization_endpoint: Url,

    /// The token endpoint; absent, only the implicit flow issues
    /// tokens directly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<Url>,

    /// The user-info endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub userinfo_endpoint: Option<Url>,

    /// The JWK set document with the provider's public signing keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<Url>,

    /// The dynamic client registration endpoint; absent, registration
    /// is out of band.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_endpoint: Option<Url>,

    /// Supported scope values.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scopes_supported: Vec<String>,

    /// Supported `response_type` values.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub response_types_supported: Vec<ResponseType>,

    /// Supported `response_mode` values.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub response_modes_supported: Vec<ResponseMode>,

    /// Supported grant types.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub grant_types_supported: Vec<String>,

    /// Supported subject identifier types.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subject_types_supported: Vec<SubjectType>,

    /// JWS algorithms available for ID Token signing, taken from the
    /// configured key set.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub id_token_signing_alg_values_supported: Vec<String>,

    /// JWS algorithms available for signed user-info responses.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub userinfo_signing_alg_values_supported: Vec<String>,
}

impl ProviderMetadata {
    /// Builds the configuration document for a provider rooted at
    /// `base_uri`, advertising the signing algorithms present in the
    /// ID Token key set.
    #[must_use]
    pub fn new(issuer: Url, base_uri: &Url, id_token_keys: &JwkSet) -> Self {
        let signing_algs = signing_algorithms(id_token_keys);
        Self {
            issuer,
            authorization_endpoint: base_uri.clone(),
            token_endpoint: None,
            userinfo_endpoint: Some(endpoint(base_uri, &["userinfo"])),
            jwks_uri: Some(endpoint(base_uri, &[".well-known", "jwksUri"])),
            registration_endpoint: None,
            scopes_supported: vec!["openid".to_string()],
            response_types_supported: vec![ResponseType::IdToken],
            response_modes_supported: vec![
                ResponseMode::Fragment,
                ResponseMode::Query,
                ResponseMode::FormPost,
            ],
            grant_types_supported: vec!["implicit".to_string()],
            subject_types_supported: vec![SubjectType::Pairwise],
            id_token_signing_alg_values_supported: signing_algs.clone(),
            userinfo_signing_alg_values_supported: signing_algs,
        }
    }
}

fn endpoint(base_uri: &Url, segments: &[&str]) -> Url {
    let mut uri = base_uri.clone();
    if let Ok(mut path) = uri.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    uri
}

/// The distinct JWA names of the signature-use keys, sorted.
fn signing_algorithms(keys: &JwkSet) -> Vec<String> {
    keys.keys
        .iter()
        .filter(|k| k.usage.is_none() || k.usage == Some(KeyUse::Sig))
        .map(|k| k.alg.as_str().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use op_crypto::jwk::{Jwk, KeyMaterial, SignatureAlgorithm};

    fn key(alg: SignatureAlgorithm, usage: Option<KeyUse>) -> Jwk {
        Jwk {
            kid: None,
            alg,
            usage,
            material: KeyMaterial::Secret(b"secret".to_vec()),
        }
    }

    fn metadata() -> ProviderMetadata {
        ProviderMetadata::new(
            Url::parse("https://op.example").unwrap(),
            &Url::parse("https://op.example/login").unwrap(),
            &JwkSet {
                keys: vec![
                    key(SignatureAlgorithm::RS256, Some(KeyUse::Sig)),
                    key(SignatureAlgorithm::ES384, None),
                    key(SignatureAlgorithm::RS256, Some(KeyUse::Sig)),
                    key(SignatureAlgorithm::HS256, Some(KeyUse::Enc)),
                ],
            },
        )
    }

    #[test]
    fn endpoints_hang_off_base() {
        let metadata = metadata();
        assert_eq!(
            metadata.authorization_endpoint.as_str(),
            "https://op.example/login"
        );
        assert_eq!(
            metadata.userinfo_endpoint.unwrap().as_str(),
            "https://op.example/login/userinfo"
        );
        assert_eq!(
            metadata.jwks_uri.unwrap().as_str(),
            "https://op.example/login/.well-known/jwksUri"
        );
    }

    #[test]
    fn signing_algorithms_deduped_and_sorted_without_enc_keys() {
        let metadata = metadata();
        assert_eq!(
            metadata.id_token_signing_alg_values_supported,
            vec!["ES384".to_string(), "RS256".to_string()]
        );
        assert_eq!(
            metadata.userinfo_signing_alg_values_supported,
            metadata.id_token_signing_alg_values_supported
        );
    }

    #[test]
    fn unsupported_fields_stay_off_the_wire() {
        let json = serde_json::to_value(metadata()).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("token_endpoint"));
        assert!(!obj.contains_key("registration_endpoint"));
        assert_eq!(json["issuer"], "https://op.example/");
        assert_eq!(json["scopes_supported"], serde_json::json!(["openid"]));
        assert_eq!(
            json["response_types_supported"],
            serde_json::json!(["id_token"])
        );
        assert_eq!(
            json["response_modes_supported"],
            serde_json::json!(["fragment", "query", "form_post"])
        );
        assert_eq!(json["grant_types_supported"], serde_json::json!(["implicit"]));
        assert_eq!(
            json["subject_types_supported"],
            serde_json::json!(["pairwise"])
        );
    }
}
