//! Authentication response construction and response-mode dispatch.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use url::Url;

use op_crypto::random::random_base64url;

use crate::claims::{IdTokenClaims, OAuthUser, StandardClaims};
use crate::error::InputError;
use crate::request::AuthenticationRequest;
use crate::token::{compute_at_hash, TokenKeyKind, TokenSigner};
use crate::types::{ResponseMode, ResponseType};

/// Validity window for minted opaque access tokens.
pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(3600);

/// A response ready for delivery to the user agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedResponse {
    /// Redirect to this URI.
    Redirect(Url),
    /// Serve this HTML page.
    Page(String),
}

/// Pluggable authorization-code issuance.
///
/// Code issuance is not implemented by the core; a deployment that
/// supports the code or hybrid flow plugs an issuer in.
pub trait CodeIssuer: Send + Sync {
    /// Issues a code bound to the user and request.
    fn issue(
        &self,
        user: &dyn OAuthUser,
        request: &AuthenticationRequest,
    ) -> Result<String, InputError>;
}

/// Registry of minted bearer tokens, consulted by user-info lookups.
pub trait BearerStore: Send + Sync {
    /// Registers a token against the claims it was minted with.
    fn register(&self, token: &str, claims: IdTokenClaims, ttl: Duration);

    /// Looks up an unexpired token.
    fn lookup(&self, token: &str) -> Option<IdTokenClaims>;
}

/// In-memory bearer store. Entries past their validity window are
/// dropped on lookup; there is no background sweep.
#[derive(Debug, Default)]
pub struct InMemoryBearerStore {
    entries: DashMap<String, (IdTokenClaims, DateTime<Utc>)>,
}

impl InMemoryBearerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves an `Authorization` header value to the standard claims
    /// of the bearer, if the token is known and unexpired.
    #[must_use]
    pub fn claims_for_header(&self, header: &str) -> Option<StandardClaims> {
        let token = header.strip_prefix("Bearer ")?;
        self.lookup(token).map(|claims| claims.standard)
    }
}

impl BearerStore for InMemoryBearerStore {
    fn register(&self, token: &str, claims: IdTokenClaims, ttl: Duration) {
        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero());
        self.entries.insert(token.to_string(), (claims, expires_at));
    }

    fn lookup(&self, token: &str) -> Option<IdTokenClaims> {
        let expired = match self.entries.get(token) {
            Some(entry) => entry.value().1 <= Utc::now(),
            None => return None,
        };
        if expired {
            self.entries.remove(token);
            return None;
        }
        self.entries.get(token).map(|entry| entry.value().0.clone())
    }
}

/// Builds signed authentication responses.
pub struct ResponseBuilder {
    issuer: String,
    signer: Arc<TokenSigner>,
    bearers: Arc<dyn BearerStore>,
    codes: Option<Arc<dyn CodeIssuer>>,
}

impl ResponseBuilder {
    /// Creates a builder for the given issuer.
    #[must_use]
    pub fn new(
        issuer: impl Into<String>,
        signer: Arc<TokenSigner>,
        bearers: Arc<dyn BearerStore>,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            signer,
            bearers,
            codes: None,
        }
    }

    /// Plugs in an authorization-code issuer.
    #[must_use]
    pub fn with_code_issuer(mut self, codes: Arc<dyn CodeIssuer>) -> Self {
        self.codes = Some(codes);
        self
    }

    /// Builds the response for an authenticated user.
    ///
    /// # Errors
    ///
    /// A missing signing key, a missing code issuer for a code-bearing
    /// request, or an encoding failure are all fatal and reported as a
    /// server error.
    pub fn build(
        &self,
        user: &dyn OAuthUser,
        request: &AuthenticationRequest,
    ) -> Result<RenderedResponse, InputError> {
        let mut params: Vec<(String, String)> = Vec::new();
        if let Some(state) = &request.state {
            params.push(("state".to_string(), state.clone()));
        }

        if request.wants(ResponseType::Code) {
            let issuer = self.codes.as_ref().ok_or_else(|| {
                tracing::error!("authorization code requested but no code issuer is configured");
                InputError::server_error()
            })?;
            params.push(("code".to_string(), issuer.issue(user, request)?));
        }

        let access_token = request
            .wants(ResponseType::Token)
            .then(|| random_base64url(32));

        let claims = self.id_token_claims(user, request, access_token.as_deref())?;

        if let Some(token) = &access_token {
            self.bearers.register(token, claims.clone(), ACCESS_TOKEN_TTL);
            params.push(("access_token".to_string(), token.clone()));
            params.push(("token_type".to_string(), "Bearer".to_string()));
            params.push((
                "expires_in".to_string(),
                ACCESS_TOKEN_TTL.as_secs().to_string(),
            ));
        }

        if request.wants(ResponseType::IdToken) {
            let signed = self
                .signer
                .sign(TokenKeyKind::IdToken, &claims)
                .map_err(|e| {
                    tracing::error!(error = %e, "ID Token signing failed");
                    InputError::server_error()
                })?;
            params.push(("id_token".to_string(), signed));
        }

        Ok(dispatch(&request.redirect_uri, &params, effective_mode(request)))
    }

    fn id_token_claims(
        &self,
        user: &dyn OAuthUser,
        request: &AuthenticationRequest,
        access_token: Option<&str>,
    ) -> Result<IdTokenClaims, InputError> {
        let mut claims =
            IdTokenClaims::new(self.issuer.clone(), user.subject(), request.client_id.clone());
        if let Some(login_time) = user.login_time() {
            claims = claims.with_auth_time(login_time.timestamp());
        }
        if let Some(nonce) = &request.nonce {
            claims = claims.with_nonce(nonce.clone());
        }
        if let Some(standard) = user.claims() {
            claims = claims.with_standard_claims(standard.clone());
        }
        if let Some(token) = access_token {
            let alg = self
                .signer
                .prepared(TokenKeyKind::IdToken)
                .map_err(|e| {
                    tracing::error!(error = %e, "no signing key for at_hash computation");
                    InputError::server_error()
                })?
                .alg;
            claims = claims.with_at_hash(compute_at_hash(alg, token));
        }
        Ok(claims)
    }
}

/// The response mode actually used for delivery.
///
/// Returning `token` and `id_token` via the query string is forbidden,
/// so that combination forces fragment encoding even when the request
/// asked for query mode.
fn effective_mode(request: &AuthenticationRequest) -> ResponseMode {
    let forbidden_in_query = request.response_type.len() == 2
        && request.wants(ResponseType::Token)
        && request.wants(ResponseType::IdToken);
    if request.response_mode == ResponseMode::Query && forbidden_in_query {
        tracing::warn!(
            client_id = %request.client_id,
            "response_type token id_token must not use query mode, forcing fragment"
        );
        return ResponseMode::Fragment;
    }
    request.response_mode
}

fn encode_params(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn dispatch(
    redirect_uri: &Url,
    params: &[(String, String)],
    mode: ResponseMode,
) -> RenderedResponse {
    match mode {
        ResponseMode::Query => {
            let mut uri = redirect_uri.clone();
            uri.set_query(Some(&encode_params(params)));
            RenderedResponse::Redirect(uri)
        }
        ResponseMode::Fragment => {
            let mut uri = redirect_uri.clone();
            uri.set_fragment(Some(&encode_params(params)));
            RenderedResponse::Redirect(uri)
        }
        ResponseMode::FormPost => RenderedResponse::Page(form_post_page(redirect_uri, params)),
    }
}

fn form_post_page(redirect_uri: &Url, params: &[(String, String)]) -> String {
    let fields: String = params
        .iter()
        .map(|(k, v)| {
            format!(
                r#"<input type="hidden" name="{}" value="{}" />"#,
                html_escape(k),
                html_escape(v)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Submitting...</title></head>
<body onload="document.forms[0].submit()">
<form method="post" action="{}">
{}
<noscript><button type="submit">Continue</button></noscript>
</form>
</body>
</html>"#,
        html_escape(redirect_uri.as_str()),
        fields
    )
}

/// Minimal HTML escaping for attribute values.
pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use op_core::CoreError;
    use op_crypto::jwk::{Jwk, JwkSet, KeyMaterial, KeyUse, SignatureAlgorithm};

    use crate::token::KeySource;
    use crate::types::{Display, Flow};

    struct HmacSource;

    impl KeySource for HmacSource {
        fn jwk_set(&self, _kind: TokenKeyKind) -> Result<JwkSet, CoreError> {
            Ok(JwkSet {
                keys: vec![Jwk {
                    kid: None,
                    alg: SignatureAlgorithm::HS256,
                    usage: Some(KeyUse::Sig),
                    material: KeyMaterial::Secret(b"0123456789abcdef0123456789abcdef".to_vec()),
                }],
            })
        }
    }

    struct TestUser;

    impl OAuthUser for TestUser {
        fn subject(&self) -> &str {
            "subject-1"
        }

        fn login_time(&self) -> Option<DateTime<Utc>> {
            Some(Utc::now())
        }

        fn claims(&self) -> Option<&StandardClaims> {
            None
        }
    }

    fn request(types: &[ResponseType], mode: ResponseMode) -> AuthenticationRequest {
        let response_type: BTreeSet<ResponseType> = types.iter().copied().collect();
        let flow = Flow::derive(&response_type);
        AuthenticationRequest {
            scope: ["openid".to_string()].into_iter().collect(),
            response_type,
            client_id: "client-1".to_string(),
            redirect_uri: Url::parse("https://client.example/cb").unwrap(),
            state: Some("st-1".to_string()),
            response_mode: mode,
            nonce: Some("n-1".to_string()),
            display: Display::Page,
            prompt: BTreeSet::new(),
            max_age: None,
            ui_locales: Vec::new(),
            id_token_hint: None,
            login_hint: None,
            acr_values: Vec::new(),
            flow,
        }
    }

    fn builder() -> (ResponseBuilder, Arc<InMemoryBearerStore>) {
        let bearers = Arc::new(InMemoryBearerStore::new());
        let signer = Arc::new(TokenSigner::new(Arc::new(HmacSource)));
        (
            ResponseBuilder::new("https://op.example", signer, bearers.clone()),
            bearers,
        )
    }

    fn fragment_params(response: &RenderedResponse) -> String {
        match response {
            RenderedResponse::Redirect(uri) => uri.fragment().unwrap().to_string(),
            RenderedResponse::Page(_) => panic!("expected redirect"),
        }
    }

    #[test]
    fn implicit_id_token_in_fragment() {
        let (builder, _) = builder();
        let response = builder
            .build(&TestUser, &request(&[ResponseType::IdToken], ResponseMode::Fragment))
            .unwrap();
        let fragment = fragment_params(&response);
        assert!(fragment.contains("id_token="));
        assert!(fragment.contains("state=st-1"));
        assert!(!fragment.contains("access_token="));
    }

    #[test]
    fn token_and_id_token_forces_fragment_over_query() {
        let (builder, _) = builder();
        let response = builder
            .build(
                &TestUser,
                &request(&[ResponseType::Token, ResponseType::IdToken], ResponseMode::Query),
            )
            .unwrap();
        match response {
            RenderedResponse::Redirect(uri) => {
                assert_eq!(uri.query(), None);
                assert!(uri.fragment().unwrap().contains("access_token="));
            }
            RenderedResponse::Page(_) => panic!("expected redirect"),
        }
    }

    #[test]
    fn minted_token_is_registered_with_at_hash_bound() {
        let (builder, bearers) = builder();
        let response = builder
            .build(
                &TestUser,
                &request(&[ResponseType::Token, ResponseType::IdToken], ResponseMode::Fragment),
            )
            .unwrap();
        let fragment = fragment_params(&response);
        let token = fragment
            .split('&')
            .find_map(|p| p.strip_prefix("access_token="))
            .unwrap()
            .to_string();

        let claims = bearers.lookup(&token).unwrap();
        assert_eq!(claims.at_hash.as_deref(), Some(&*compute_at_hash(
            SignatureAlgorithm::HS256,
            &token,
        )));
        assert!(fragment.contains("token_type=Bearer"));
        assert!(fragment.contains("expires_in=3600"));
    }

    #[test]
    fn at_hash_absent_without_access_token() {
        let (builder, _) = builder();
        let claims = builder
            .id_token_claims(&TestUser, &request(&[ResponseType::IdToken], ResponseMode::Fragment), None)
            .unwrap();
        assert!(claims.at_hash.is_none());
        assert_eq!(claims.nonce.as_deref(), Some("n-1"));
        assert!(claims.auth_time.is_some());
    }

    #[test]
    fn code_without_issuer_is_server_error() {
        let (builder, _) = builder();
        let err = builder
            .build(&TestUser, &request(&[ResponseType::Code], ResponseMode::Query))
            .unwrap_err();
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn code_with_issuer_lands_in_query() {
        struct FixedCodes;
        impl CodeIssuer for FixedCodes {
            fn issue(
                &self,
                _user: &dyn OAuthUser,
                _request: &AuthenticationRequest,
            ) -> Result<String, InputError> {
                Ok("code-123".to_string())
            }
        }

        let (builder, _) = builder();
        let builder = builder.with_code_issuer(Arc::new(FixedCodes));
        let response = builder
            .build(&TestUser, &request(&[ResponseType::Code], ResponseMode::Query))
            .unwrap();
        match response {
            RenderedResponse::Redirect(uri) => {
                let query = uri.query().unwrap();
                assert!(query.contains("code=code-123"));
                assert!(query.contains("state=st-1"));
            }
            RenderedResponse::Page(_) => panic!("expected redirect"),
        }
    }

    #[test]
    fn form_post_renders_hidden_fields() {
        let (builder, _) = builder();
        let response = builder
            .build(&TestUser, &request(&[ResponseType::IdToken], ResponseMode::FormPost))
            .unwrap();
        match response {
            RenderedResponse::Page(html) => {
                assert!(html.contains(r#"action="https://client.example/cb""#));
                assert!(html.contains(r#"name="id_token""#));
                assert!(html.contains(r#"name="state""#));
                assert!(html.contains("document.forms[0].submit()"));
            }
            RenderedResponse::Redirect(_) => panic!("expected page"),
        }
    }

    #[test]
    fn bearer_store_expires_entries() {
        let store = InMemoryBearerStore::new();
        let claims = IdTokenClaims::new("i", "s", "c");
        store.register("t1", claims.clone(), Duration::from_secs(0));
        assert!(store.lookup("t1").is_none());

        store.register("t2", claims, Duration::from_secs(60));
        assert!(store.lookup("t2").is_some());
        assert!(store.claims_for_header("Bearer t2").is_some());
        assert!(store.claims_for_header("Basic t2").is_none());
    }

    #[test]
    fn html_escape_special_chars() {
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("a & b"), "a &amp; b");
        assert_eq!(html_escape(r#"x"y"#), "x&quot;y");
    }
}
