//! Claim models and the authenticated-user abstraction.
//!
//! Standard claims are a statically declared serde mapping; only fields
//! that are set appear on the wire, and the address claim nests as its
//! own object per OpenID Connect Core 1.0 §5.1.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::request::AuthenticationRequest;

/// The nested `address` claim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressClaim {
    /// Full mailing address, formatted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,

    /// Street address component.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_address: Option<String>,

    /// City or locality.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,

    /// State, province or region.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Zip or postal code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,

    /// Country name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Standard profile claims, flattened into the ID Token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardClaims {
    /// Full name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Given name(s).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,

    /// Surname(s).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,

    /// Middle name(s).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,

    /// Casual name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,

    /// Shorthand name the user goes by.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,

    /// Profile page URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Profile picture URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    /// Web page or blog URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    /// Preferred e-mail address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Whether the e-mail address has been verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,

    /// Gender.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    /// Birthday, ISO 8601 `YYYY-MM-DD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthdate: Option<String>,

    /// Time zone, e.g. `Europe/Amsterdam`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoneinfo: Option<String>,

    /// Locale, e.g. `nl-NL`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    /// Preferred telephone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,

    /// Whether the phone number has been verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number_verified: Option<bool>,

    /// Postal address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<AddressClaim>,

    /// Time the profile was last updated, seconds since the epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

/// The claim set of an ID Token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Issuer identifier.
    pub iss: String,

    /// Subject identifier.
    pub sub: String,

    /// Audience, the requesting client's id.
    pub aud: String,

    /// Expiration time, seconds since the epoch.
    pub exp: i64,

    /// Issued-at time, seconds since the epoch.
    pub iat: i64,

    /// Time of the user's authentication, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_time: Option<i64>,

    /// Nonce from the authentication request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Access-token hash, present when an access token was issued
    /// alongside this ID Token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at_hash: Option<String>,

    /// Flattened standard claims.
    #[serde(flatten)]
    pub standard: StandardClaims,
}

/// ID Token validity window.
pub const ID_TOKEN_LIFETIME_SECS: i64 = 600;

impl IdTokenClaims {
    /// Creates a claim set issued now, expiring after the standard
    /// ten-minute window.
    #[must_use]
    pub fn new(iss: impl Into<String>, sub: impl Into<String>, aud: impl Into<String>) -> Self {
        let now = Utc::now().timestamp();
        Self {
            iss: iss.into(),
            sub: sub.into(),
            aud: aud.into(),
            exp: now + ID_TOKEN_LIFETIME_SECS,
            iat: now,
            auth_time: None,
            nonce: None,
            at_hash: None,
            standard: StandardClaims::default(),
        }
    }

    /// Sets the `auth_time` claim.
    #[must_use]
    pub const fn with_auth_time(mut self, auth_time: i64) -> Self {
        self.auth_time = Some(auth_time);
        self
    }

    /// Sets the `nonce` claim.
    #[must_use]
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Sets the `at_hash` claim.
    #[must_use]
    pub fn with_at_hash(mut self, at_hash: impl Into<String>) -> Self {
        self.at_hash = Some(at_hash.into());
        self
    }

    /// Merges in the user's standard claims.
    #[must_use]
    pub fn with_standard_claims(mut self, standard: StandardClaims) -> Self {
        self.standard = standard;
        self
    }
}

/// An authenticated end-user, as produced by the user-session
/// collaborator.
pub trait OAuthUser: Send + Sync {
    /// Stable subject identifier.
    fn subject(&self) -> &str;

    /// When the user authenticated, if known.
    fn login_time(&self) -> Option<DateTime<Utc>>;

    /// Standard profile claims, if any were released.
    fn claims(&self) -> Option<&StandardClaims>;

    /// The authentication request this login answers, for users
    /// materialized from an out-of-band callback.
    fn authentication_request(&self) -> Option<&AuthenticationRequest> {
        None
    }
}
