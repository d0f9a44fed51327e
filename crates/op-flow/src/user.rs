//! The user materialized from a node callback.

use chrono::{DateTime, Utc};
use url::Url;

use op_protocol::claims::{OAuthUser, StandardClaims};
use op_protocol::request::AuthenticationRequest;

use crate::connect::CallbackInput;

/// A user who connected through the companion authenticator.
///
/// Built from a callback as a login template; the user-session manager
/// materializes the actual logged-in user from it.
#[derive(Debug, Clone)]
pub struct CompanionUser {
    pid: String,
    connection: Url,
    request: Option<AuthenticationRequest>,
    login_time: Option<DateTime<Utc>>,
    claims: Option<StandardClaims>,
}

impl CompanionUser {
    /// Builds a login template from a callback payload, deserializing
    /// the echoed authentication request.
    pub fn from_callback(input: &CallbackInput) -> Result<Self, serde_json::Error> {
        Ok(Self {
            pid: input.pid.clone(),
            connection: input.connection.clone(),
            request: Some(input.request()?),
            login_time: None,
            claims: None,
        })
    }

    /// The connection URI at the node.
    #[must_use]
    pub fn connection(&self) -> &Url {
        &self.connection
    }

    /// Marks the login time.
    #[must_use]
    pub fn with_login_time(mut self, login_time: DateTime<Utc>) -> Self {
        self.login_time = Some(login_time);
        self
    }

    /// Attaches released profile claims.
    #[must_use]
    pub fn with_claims(mut self, claims: StandardClaims) -> Self {
        self.claims = Some(claims);
        self
    }
}

impl OAuthUser for CompanionUser {
    fn subject(&self) -> &str {
        &self.pid
    }

    fn login_time(&self) -> Option<DateTime<Utc>> {
        self.login_time
    }

    fn claims(&self) -> Option<&StandardClaims> {
        self.claims.as_ref()
    }

    fn authentication_request(&self) -> Option<&AuthenticationRequest> {
        self.request.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use op_protocol::types::{Display, Flow, ResponseMode, ResponseType};

    fn request() -> AuthenticationRequest {
        let response_type: BTreeSet<ResponseType> = [ResponseType::IdToken].into_iter().collect();
        AuthenticationRequest {
            scope: ["openid".to_string()].into_iter().collect(),
            response_type: response_type.clone(),
            client_id: "client-1".to_string(),
            redirect_uri: Url::parse("https://client.example/cb").unwrap(),
            state: None,
            response_mode: ResponseMode::Fragment,
            nonce: None,
            display: Display::Page,
            prompt: BTreeSet::new(),
            max_age: None,
            ui_locales: Vec::new(),
            id_token_hint: None,
            login_hint: None,
            acr_values: Vec::new(),
            flow: Flow::derive(&response_type),
        }
    }

    #[test]
    fn template_carries_echoed_request() {
        let input = CallbackInput {
            pid: "subject-1".to_string(),
            connection: Url::parse("https://node.example/connections/1").unwrap(),
            body: request().to_bytes().unwrap(),
        };
        let user = CompanionUser::from_callback(&input).unwrap();
        assert_eq!(user.subject(), "subject-1");
        assert_eq!(user.authentication_request(), Some(&request()));
        assert!(user.login_time().is_none());
    }

    #[test]
    fn malformed_body_is_rejected() {
        let input = CallbackInput {
            pid: "subject-1".to_string(),
            connection: Url::parse("https://node.example/connections/1").unwrap(),
            body: b"not json".to_vec(),
        };
        assert!(CompanionUser::from_callback(&input).is_err());
    }
}
