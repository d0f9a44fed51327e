//! Authentication request parsing and validation.
//!
//! Parsing order matters: the redirect URI and client ownership are
//! established first so that every later validation failure can be
//! reported by redirect instead of a bare 400. Construction either
//! yields a fully validated request or an error; there is no partially
//! valid state.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ErrorTarget, InputError};
use crate::types::{Display, Flow, LanguageTag, Prompt, ResponseMode, ResponseType};

/// A registered OAuth client, resolved through the client store.
pub trait OAuthClient: Send + Sync {
    /// The client identifier.
    fn id(&self) -> &str;

    /// Whether the client registered the given redirect URI.
    fn owns_redirect_uri(&self, uri: &Url) -> bool;
}

/// Resolves client ids to registered clients.
pub trait ClientResolver: Send + Sync {
    /// Looks a client up by id.
    fn client_by_id(&self, client_id: &str) -> Option<Arc<dyn OAuthClient>>;
}

/// Raw request parameters, keeping duplicates so they can be rejected.
#[derive(Debug, Clone, Default)]
pub struct RawParams {
    values: HashMap<String, Vec<String>>,
}

impl RawParams {
    /// Collects parameters from key/value pairs.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            params.insert(key, value);
        }
        params
    }

    /// Adds one parameter occurrence.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.entry(key.into()).or_default().push(value.into());
    }

    /// Returns the single trimmed value for a key.
    ///
    /// An absent key or a blank value yields `None`; a key supplied
    /// more than once is an `invalid_request`.
    fn single(&self, key: &str) -> Result<Option<&str>, InputError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(values) if values.len() > 1 => {
                Err(InputError::invalid_request(format!("Multiple parameters {key}")))
            }
            Some(values) => {
                let trimmed = values[0].trim();
                Ok(if trimmed.is_empty() { None } else { Some(trimmed) })
            }
        }
    }
}

/// A parse failure, with the redirect target when one was established
/// before the failure.
#[derive(Debug, Clone)]
pub struct ParseFailure {
    /// What went wrong.
    pub error: InputError,
    /// Where the error can be redirected, if anywhere.
    pub target: Option<ErrorTarget>,
}

impl ParseFailure {
    fn bare(error: InputError) -> Self {
        Self { error, target: None }
    }
}

/// A validated authentication request.
///
/// Serializes loss-free to JSON; the byte form is echoed through the
/// external authenticator so no server-side flow state is needed beyond
/// the correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticationRequest {
    /// Requested scopes; always contains `openid`.
    pub scope: BTreeSet<String>,

    /// Requested response types; never empty.
    pub response_type: BTreeSet<ResponseType>,

    /// The requesting client's id.
    pub client_id: String,

    /// Verified redirect URI, fragment-free, owned by the client.
    pub redirect_uri: Url,

    /// Opaque client state, echoed back in responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Response mode, explicit or defaulted from the flow.
    pub response_mode: ResponseMode,

    /// Replay-protection nonce.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Requested UI display.
    pub display: Display,

    /// Requested prompt behavior.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub prompt: BTreeSet<Prompt>,

    /// Maximum allowable authentication age in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i64>,

    /// Preferred UI languages, in preference order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ui_locales: Vec<LanguageTag>,

    /// Previously issued ID Token, as a hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token_hint: Option<String>,

    /// Login identifier hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_hint: Option<String>,

    /// Requested authentication context class references.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acr_values: Vec<String>,

    /// Flow derived from the response-type set.
    pub flow: Flow,
}

impl AuthenticationRequest {
    /// Parses and validates raw parameters into a request.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseFailure`]; its `target` is set once the
    /// redirect URI and client ownership have been verified, so callers
    /// can redirect the error to the client.
    pub fn parse(
        params: &RawParams,
        clients: &dyn ClientResolver,
    ) -> Result<Self, ParseFailure> {
        // No redirect target until the URI and its owner check out.
        let redirect_uri = parse_redirect_uri(params).map_err(ParseFailure::bare)?;

        let client_id = params
            .single("client_id")
            .map_err(ParseFailure::bare)?
            .unwrap_or_default()
            .to_string();
        let client = clients.client_by_id(&client_id).ok_or_else(|| {
            ParseFailure::bare(InputError::invalid_request(format!(
                "No client was found for client_id {client_id}"
            )))
        })?;
        if !client.owns_redirect_uri(&redirect_uri) {
            return Err(ParseFailure::bare(InputError::invalid_request(
                "redirect_uri is not registered for this client",
            )));
        }

        // Target established; later failures redirect.
        let mut target = ErrorTarget {
            redirect_uri: redirect_uri.clone(),
            state: None,
        };
        let state = params
            .single("state")
            .map_err(|e| fail(&target, e))?
            .map(ToString::to_string);
        target.state.clone_from(&state);

        let scope = parse_scope(params).map_err(|e| fail(&target, e))?;
        let response_type = parse_response_type(params).map_err(|e| fail(&target, e))?;
        let flow = Flow::derive(&response_type);

        let response_mode = match params.single("response_mode").map_err(|e| fail(&target, e))? {
            Some(value) => value.parse().map_err(|()| {
                fail(
                    &target,
                    InputError::invalid_request(format!("Unknown response_mode {value}")),
                )
            })?,
            None => ResponseMode::default_for(flow),
        };

        let nonce = params
            .single("nonce")
            .map_err(|e| fail(&target, e))?
            .map(ToString::to_string);

        let display = match params.single("display").map_err(|e| fail(&target, e))? {
            Some(value) => value.parse().map_err(|()| {
                fail(
                    &target,
                    InputError::invalid_request(format!("Unknown display value {value}")),
                )
            })?,
            None => Display::default(),
        };

        let prompt = parse_prompt(params).map_err(|e| fail(&target, e))?;

        let max_age = params
            .single("max_age")
            .map_err(|e| fail(&target, e))?
            .map(parse_max_age)
            .transpose()
            .map_err(|e| fail(&target, e))?;

        let ui_locales = parse_ui_locales(params).map_err(|e| fail(&target, e))?;

        let id_token_hint = params
            .single("id_token_hint")
            .map_err(|e| fail(&target, e))?
            .map(ToString::to_string);
        let login_hint = params
            .single("login_hint")
            .map_err(|e| fail(&target, e))?
            .map(ToString::to_string);
        let acr_values = params
            .single("acr_values")
            .map_err(|e| fail(&target, e))?
            .map(|v| v.split_whitespace().map(ToString::to_string).collect())
            .unwrap_or_default();

        // Final constraint pass; every remaining violation reported at once.
        let mut violations = Vec::new();
        if response_type.is_empty() {
            violations.push("response_type: must not be empty".to_string());
        }
        if client_id.chars().any(char::is_whitespace) {
            violations.push("client_id: must not contain whitespace".to_string());
        }
        if !violations.is_empty() {
            return Err(fail(&target, InputError::invalid_request(violations.join("\n"))));
        }

        Ok(Self {
            scope,
            response_type,
            client_id,
            redirect_uri,
            state,
            response_mode,
            nonce,
            display,
            prompt,
            max_age,
            ui_locales,
            id_token_hint,
            login_hint,
            acr_values,
            flow,
        })
    }

    /// The redirect target for reporting errors that occur after
    /// validation succeeded.
    #[must_use]
    pub fn error_target(&self) -> ErrorTarget {
        ErrorTarget {
            redirect_uri: self.redirect_uri.clone(),
            state: self.state.clone(),
        }
    }

    /// Whether `prompt=none` was requested.
    #[must_use]
    pub fn is_prompt_none(&self) -> bool {
        self.prompt.contains(&Prompt::None)
    }

    /// Whether the given response type was requested.
    #[must_use]
    pub fn wants(&self, response_type: ResponseType) -> bool {
        self.response_type.contains(&response_type)
    }

    /// Serializes the request to its echoed byte form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserializes a request from its echoed byte form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

fn fail(target: &ErrorTarget, error: InputError) -> ParseFailure {
    ParseFailure {
        error,
        target: Some(target.clone()),
    }
}

fn parse_redirect_uri(params: &RawParams) -> Result<Url, InputError> {
    let raw = params
        .single("redirect_uri")?
        .ok_or_else(|| InputError::invalid_request("redirect_uri is required"))?;
    // Any fragment is dropped before parsing.
    let raw = raw.split('#').next().unwrap_or_default();
    let uri = Url::parse(raw)
        .map_err(|_| InputError::invalid_request("redirect_uri is not a valid URI"))?;
    if uri.scheme() != "http" && uri.scheme() != "https" {
        return Err(InputError::invalid_request(
            "redirect_uri scheme must be http or https",
        ));
    }
    Ok(uri)
}

/// The OAuth scope-token character class: printable ASCII minus `"`
/// and `\`.
fn is_scope_char(c: char) -> bool {
    ('\x21'..='\x7e').contains(&c) && c != '"' && c != '\\'
}

fn parse_scope(params: &RawParams) -> Result<BTreeSet<String>, InputError> {
    let scope: BTreeSet<String> = params
        .single("scope")?
        .map(|v| v.split_whitespace().map(ToString::to_string).collect())
        .unwrap_or_default();
    if !scope.contains("openid") {
        return Err(InputError::invalid_scope("scope must contain openid"));
    }
    for token in &scope {
        if !token.chars().all(is_scope_char) {
            return Err(InputError::invalid_scope(format!(
                "illegal scope token: {token}"
            )));
        }
    }
    Ok(scope)
}

fn parse_response_type(params: &RawParams) -> Result<BTreeSet<ResponseType>, InputError> {
    let mut set = BTreeSet::new();
    if let Some(value) = params.single("response_type")? {
        for token in value.split_whitespace() {
            let parsed = token.parse().map_err(|()| {
                InputError::unsupported_response_type(format!(
                    "Unknown response_type {token}"
                ))
            })?;
            set.insert(parsed);
        }
    }
    Ok(set)
}

fn parse_prompt(params: &RawParams) -> Result<BTreeSet<Prompt>, InputError> {
    let mut set = BTreeSet::new();
    if let Some(value) = params.single("prompt")? {
        for token in value.split_whitespace() {
            let parsed = token.parse().map_err(|()| {
                InputError::invalid_request(format!("Unknown prompt value {token}"))
            })?;
            set.insert(parsed);
        }
    }
    if set.contains(&Prompt::None) && set.len() > 1 {
        return Err(InputError::invalid_request(
            "prompt none must not be combined with other values",
        ));
    }
    Ok(set)
}

/// Parses `max_age` as an arbitrary-precision integer truncated into
/// `i64` range. Truncation is deliberate and lossy, not an error.
fn parse_max_age(value: &str) -> Result<i64, InputError> {
    let (negative, digits) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InputError::invalid_request("max_age must be an integer"));
    }
    let mut acc: i64 = 0;
    for b in digits.bytes() {
        acc = acc.wrapping_mul(10).wrapping_add(i64::from(b - b'0'));
    }
    Ok(if negative { acc.wrapping_neg() } else { acc })
}

fn parse_ui_locales(params: &RawParams) -> Result<Vec<LanguageTag>, InputError> {
    params
        .single("ui_locales")?
        .map(|v| {
            v.split_whitespace()
                .map(|t| LanguageTag::parse(t).map_err(InputError::invalid_request))
                .collect()
        })
        .unwrap_or_else(|| Ok(Vec::new()))
}
