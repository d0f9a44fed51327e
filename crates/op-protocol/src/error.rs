//! Protocol error taxonomy and error-response construction.
//!
//! Implements the OAuth 2.0 / OpenID Connect error responses defined in
//! RFC 6749 and OpenID Connect Core 1.0, restricted to the closed set
//! of codes this provider emits.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use op_crypto::random::random_log_key;

/// The closed set of error codes this provider reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed or inconsistent request parameters.
    InvalidRequest,
    /// Missing `openid` scope or an illegal scope token.
    InvalidScope,
    /// An unrecognized `response_type` value.
    UnsupportedResponseType,
    /// Anything unexpected; details stay in the server log.
    ServerError,
}

impl ErrorCode {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidScope => "invalid_scope",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::ServerError => "server_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected input, carrying a code from the closed taxonomy and a
/// human-readable description.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{code}: {description}")]
pub struct InputError {
    /// Error code.
    pub code: ErrorCode,
    /// Description suitable for the `error_description` parameter.
    pub description: String,
}

impl InputError {
    /// Builds an `invalid_request` error.
    #[must_use]
    pub fn invalid_request(description: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::InvalidRequest,
            description: description.into(),
        }
    }

    /// Builds an `invalid_scope` error.
    #[must_use]
    pub fn invalid_scope(description: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::InvalidScope,
            description: description.into(),
        }
    }

    /// Builds an `unsupported_response_type` error.
    #[must_use]
    pub fn unsupported_response_type(description: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::UnsupportedResponseType,
            description: description.into(),
        }
    }

    /// Builds a `server_error` with a generic description; the detail
    /// belongs in the log, never in the response.
    #[must_use]
    pub fn server_error() -> Self {
        Self {
            code: ErrorCode::ServerError,
            description: "An internal error occurred".to_string(),
        }
    }

    /// The HTTP status for a direct (non-redirect) error response.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self.code {
            ErrorCode::ServerError => 500,
            _ => 400,
        }
    }
}

/// JSON body for errors that cannot be redirected to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code.
    pub error: String,

    /// Human-readable error description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,

    /// Random key correlating the response with server logs; only set
    /// for server errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_key: Option<String>,
}

/// A redirect target established early during request parsing.
///
/// Once the `redirect_uri` has been parsed and client ownership has
/// been verified, later validation errors can be reported to the client
/// by redirect instead of a bare 400.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorTarget {
    /// The verified redirect URI.
    pub redirect_uri: Url,
    /// The `state` parameter, echoed back verbatim.
    pub state: Option<String>,
}

impl ErrorTarget {
    /// Builds the error redirect URI: `error`, `error_description` and
    /// `state` (empty when absent) replace any existing query string.
    #[must_use]
    pub fn error_uri(&self, error: &InputError) -> Url {
        let mut uri = self.redirect_uri.clone();
        uri.query_pairs_mut()
            .clear()
            .append_pair("error", error.code.as_str())
            .append_pair("error_description", &error.description)
            .append_pair("state", self.state.as_deref().unwrap_or(""))
            .finish();
        uri
    }
}

/// How a protocol error is reported to the caller.
#[derive(Debug, Clone)]
pub enum ErrorDisposition {
    /// Redirect to the client's `redirect_uri` with error parameters.
    Redirect(Url),
    /// Direct response: HTTP status plus a JSON body.
    Direct {
        /// HTTP status code.
        status: u16,
        /// JSON error body.
        body: ErrorResponse,
    },
}

impl ErrorDisposition {
    /// Chooses redirect or direct reporting depending on whether a
    /// redirect target was established before the failure.
    ///
    /// Server errors reported directly get a random log key; the same
    /// key is logged so operators can cross-reference.
    #[must_use]
    pub fn report(target: Option<&ErrorTarget>, error: &InputError) -> Self {
        if let Some(target) = target {
            return Self::Redirect(target.error_uri(error));
        }
        let log_key = if error.code == ErrorCode::ServerError {
            let key = random_log_key();
            tracing::error!(log_key = %key, error = %error, "server error without redirect target");
            Some(key)
        } else {
            None
        };
        Self::Direct {
            status: error.http_status(),
            body: ErrorResponse {
                error: error.code.as_str().to_string(),
                error_description: Some(error.description.clone()),
                log_key,
            },
        }
    }
}
