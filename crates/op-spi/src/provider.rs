//! Collaborator contracts.

use std::sync::Arc;

use async_trait::async_trait;

use op_core::CoreError;
use op_crypto::jwk::JwkSet;
use op_protocol::claims::OAuthUser;
use op_protocol::error::InputError;
use op_protocol::request::{AuthenticationRequest, ClientResolver};
use op_protocol::response::RenderedResponse;
use op_protocol::token::TokenKeyKind;

use crate::session::SessionHandle;

/// Configuration source.
pub trait Configuration: Send + Sync {
    /// Returns the value for a key, if this provider has it.
    fn get(&self, key: &str) -> Option<serde_json::Value>;
}

/// Client registrations.
///
/// Resolution by id comes from [`ClientResolver`]; this adds the
/// origin check used for CORS decisions at the serving layer.
pub trait ClientStore: ClientResolver {
    /// Whether any client registered the given origin; `None` when the
    /// store cannot tell.
    fn exists_origin(&self, origin: &str) -> Option<bool>;
}

/// Secret material.
pub trait SecretStore: Send + Sync {
    /// The shared password for the external authenticator node.
    fn node_password(&self) -> Result<String, CoreError>;

    /// The node's private key, PKCS#8 DER.
    fn node_private_key(&self) -> Result<Vec<u8>, CoreError>;

    /// The JWK set for a token use.
    fn jwk_set(&self, kind: TokenKeyKind) -> Result<JwkSet, CoreError>;
}

/// User login state per session.
pub trait UserSessionManager: Send + Sync {
    /// The user logged in on this session, if any.
    fn logged_in(&self, session: &SessionHandle) -> Option<Arc<dyn OAuthUser>>;

    /// Logs the session out. A no-op when nobody is logged in.
    fn logout(&self, session: &SessionHandle);

    /// Attempts to materialize and log in the user described by the
    /// template. `None` when the backing system cannot (yet) produce
    /// the user.
    fn login(
        &self,
        template: &dyn OAuthUser,
        session: &SessionHandle,
    ) -> Option<Arc<dyn OAuthUser>>;
}

/// An authorization-flow provider.
///
/// Multiple providers may be configured; the first one to return a
/// response wins (see `Services::start_flow` in `op-flow` callers).
#[async_trait]
pub trait AuthorizationFlow: Send + Sync {
    /// Starts the flow for a validated request, returning a renderable
    /// response, or `None` when this provider does not handle the
    /// request.
    async fn start_flow(
        &self,
        request: &AuthenticationRequest,
        session: &SessionHandle,
    ) -> Result<Option<RenderedResponse>, InputError>;

    /// Whether the provider's callback and watch URL templates resolve.
    fn is_healthy(&self) -> bool;
}
