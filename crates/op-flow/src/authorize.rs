//! Front door of the authorization endpoint.
//!
//! Parses and validates the incoming request, decides whether the
//! session's current login is usable for it, and either answers
//! directly or hands off to the configured flow providers.

use std::sync::Arc;

use chrono::Utc;

use op_core::config::keys;
use op_core::CoreError;
use op_protocol::claims::{OAuthUser, StandardClaims};
use op_protocol::discovery::ProviderMetadata;
use op_protocol::error::{ErrorDisposition, InputError};
use op_protocol::request::{AuthenticationRequest, RawParams};
use op_protocol::response::{InMemoryBearerStore, RenderedResponse, ResponseBuilder};
use op_protocol::token::{KeySource, TokenKeyKind};
use op_protocol::types::Prompt;
use op_spi::{AuthorizationFlow, ProviderRegistry, Services, SessionHandle};

use crate::orchestrator::parse_config_uri;

/// What the authorization endpoint produced.
#[derive(Debug, Clone)]
pub enum AuthorizeOutcome {
    /// A completed authentication response, ready for delivery.
    Response(RenderedResponse),
    /// `prompt=none` was requested but nobody is logged in; the caller
    /// answers with a bare 401.
    Unauthorized,
    /// A flow was started; serve this to the user agent.
    Started(RenderedResponse),
}

/// Serves the authorization endpoint over the configured flows.
pub struct Authorizer {
    services: Arc<Services>,
    flows: ProviderRegistry<dyn AuthorizationFlow>,
    builder: Arc<ResponseBuilder>,
    bearers: Arc<InMemoryBearerStore>,
}

impl Authorizer {
    /// Creates an authorizer over the given collaborators.
    #[must_use]
    pub fn new(
        services: Arc<Services>,
        flows: ProviderRegistry<dyn AuthorizationFlow>,
        builder: Arc<ResponseBuilder>,
        bearers: Arc<InMemoryBearerStore>,
    ) -> Self {
        Self {
            services,
            flows,
            builder,
            bearers,
        }
    }

    /// Handles one authorization request.
    ///
    /// # Errors
    ///
    /// Every failure comes back as an [`ErrorDisposition`] telling the
    /// serving layer whether to redirect the error to the client or
    /// answer directly.
    pub async fn authorize(
        &self,
        params: &RawParams,
        session: &SessionHandle,
    ) -> Result<AuthorizeOutcome, ErrorDisposition> {
        let request = AuthenticationRequest::parse(params, &*self.services)
            .map_err(|failure| ErrorDisposition::report(failure.target.as_ref(), &failure.error))?;
        let target = request.error_target();

        if let Some(user) = self.services.logged_in(session) {
            if needs_logout(&*user, &request) {
                tracing::debug!(client_id = %request.client_id, "existing login unusable, logging out");
                self.services.logout(session);
            } else {
                let response = self
                    .builder
                    .build(&*user, &request)
                    .map_err(|e| ErrorDisposition::report(Some(&target), &e))?;
                return Ok(AuthorizeOutcome::Response(response));
            }
        }

        if request.is_prompt_none() {
            return Ok(AuthorizeOutcome::Unauthorized);
        }

        for (index, flow) in self.flows.preferred_order() {
            match flow.start_flow(&request, session).await {
                Ok(Some(response)) => {
                    self.flows.mark_successful(index);
                    return Ok(AuthorizeOutcome::Started(response));
                }
                Ok(None) => {}
                Err(e) => return Err(ErrorDisposition::report(Some(&target), &e)),
            }
        }

        tracing::error!(client_id = %request.client_id, "no flow provider handled the request");
        Err(ErrorDisposition::report(
            Some(&target),
            &InputError::server_error(),
        ))
    }

    /// The provider configuration document served at
    /// `.well-known/openid-configuration`, assembled from the
    /// configured issuer, base URI and ID Token key set.
    pub fn discovery(&self) -> Result<ProviderMetadata, CoreError> {
        let issuer = parse_config_uri(&self.services, keys::ISSUER)?;
        let base_uri = parse_config_uri(&self.services, keys::BASE_URI)?;
        let id_token_keys = self.services.jwk_set(TokenKeyKind::IdToken)?;
        Ok(ProviderMetadata::new(issuer, &base_uri, &id_token_keys))
    }

    /// Resolves a user-info `Authorization` header to the bearer's
    /// standard claims.
    #[must_use]
    pub fn user_info(&self, authorization: &str) -> Option<StandardClaims> {
        self.bearers.claims_for_header(authorization)
    }

    /// Healthy when at least one flow provider is configured and all of
    /// them report healthy.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        !self.flows.is_empty() && self.flows.iter().all(|flow| flow.is_healthy())
    }
}

/// Whether the existing login cannot satisfy the request: the client
/// demanded a fresh login, or the login is older than `max_age` allows.
fn needs_logout(user: &dyn OAuthUser, request: &AuthenticationRequest) -> bool {
    if request.prompt.contains(&Prompt::Login) {
        return true;
    }
    match (request.max_age, user.login_time()) {
        (Some(max_age), Some(login_time)) => {
            Utc::now().timestamp() - login_time.timestamp() > max_age
        }
        (Some(_), None) => true,
        (None, _) => false,
    }
}
