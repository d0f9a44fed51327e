//! Protocol enums and small value types.
//!
//! Wire names follow OpenID Connect Core 1.0; parsing is strict except
//! where the protocol defines a default (`display`, `response_mode`).

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// OAuth 2.0 / OIDC response types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResponseType {
    /// Authorization code.
    #[serde(rename = "code")]
    Code,
    /// ID Token.
    #[serde(rename = "id_token")]
    IdToken,
    /// Access token.
    #[serde(rename = "token")]
    Token,
}

impl ResponseType {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::IdToken => "id_token",
            Self::Token => "token",
        }
    }
}

impl FromStr for ResponseType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code" => Ok(Self::Code),
            "id_token" => Ok(Self::IdToken),
            "token" => Ok(Self::Token),
            _ => Err(()),
        }
    }
}

/// Authentication flow, derived from the response-type set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Flow {
    /// `response_type=code`.
    AuthorizationCode,
    /// No `code` in the response-type set.
    Implicit,
    /// `code` combined with `id_token` and/or `token`.
    Hybrid,
}

impl Flow {
    /// Derives the flow from a response-type set.
    ///
    /// `code` alone is the code flow, `code` plus anything else is
    /// hybrid, everything else is implicit.
    #[must_use]
    pub fn derive(response_type: &BTreeSet<ResponseType>) -> Self {
        if response_type.contains(&ResponseType::Code) {
            if response_type.len() == 1 {
                Self::AuthorizationCode
            } else {
                Self::Hybrid
            }
        } else {
            Self::Implicit
        }
    }
}

/// How response parameters are delivered back to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseMode {
    /// Parameters in the redirect query string.
    #[serde(rename = "query")]
    Query,
    /// Parameters in the redirect URI fragment.
    #[serde(rename = "fragment")]
    Fragment,
    /// Parameters posted by a self-submitting form.
    #[serde(rename = "form_post")]
    FormPost,
}

impl ResponseMode {
    /// The default mode for a flow: query for the code flow, fragment
    /// otherwise.
    #[must_use]
    pub const fn default_for(flow: Flow) -> Self {
        match flow {
            Flow::AuthorizationCode => Self::Query,
            Flow::Implicit | Flow::Hybrid => Self::Fragment,
        }
    }
}

impl FromStr for ResponseMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query" => Ok(Self::Query),
            "fragment" => Ok(Self::Fragment),
            "form_post" => Ok(Self::FormPost),
            _ => Err(()),
        }
    }
}

/// Subject identifier type advertised in the discovery document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectType {
    /// The same subject value for every client.
    Public,
    /// A different subject value per client.
    Pairwise,
}

/// Requested display of the authentication UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Display {
    /// Full page (the default).
    #[default]
    Page,
    /// Popup window.
    Popup,
    /// Touch device.
    Touch,
    /// Feature phone.
    Wap,
}

impl FromStr for Display {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "page" => Ok(Self::Page),
            "popup" => Ok(Self::Popup),
            "touch" => Ok(Self::Touch),
            "wap" => Ok(Self::Wap),
            _ => Err(()),
        }
    }
}

/// Requested re-authentication and consent behavior.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Prompt {
    /// No interaction; must be the only prompt value when present.
    None,
    /// Force re-authentication.
    Login,
    /// Force consent.
    Consent,
    /// Force account selection.
    SelectAccount,
}

impl FromStr for Prompt {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "login" => Ok(Self::Login),
            "consent" => Ok(Self::Consent),
            "select_account" => Ok(Self::SelectAccount),
            _ => Err(()),
        }
    }
}

/// A BCP 47 language tag, validated only as far as the primary subtag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageTag(String);

impl LanguageTag {
    /// Parses a tag; the primary language subtag must be one to eight
    /// ASCII letters.
    pub fn parse(tag: &str) -> Result<Self, String> {
        let primary = tag.split('-').next().unwrap_or_default();
        if primary.is_empty()
            || primary.len() > 8
            || !primary.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(format!("invalid language tag: {tag}"));
        }
        Ok(Self(tag.to_string()))
    }

    /// The full tag as given.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LanguageTag {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LanguageTag> for String {
    fn from(tag: LanguageTag) -> Self {
        tag.0
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
