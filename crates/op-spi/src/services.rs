//! The wiring facade over all collaborator registries.
//!
//! Built once at startup and passed by handle to everything that needs
//! collaborator access; there is no global state.

use std::sync::Arc;

use op_core::CoreError;
use op_crypto::jwk::JwkSet;
use op_protocol::claims::OAuthUser;
use op_protocol::request::{ClientResolver, OAuthClient};
use op_protocol::token::{KeySource, TokenKeyKind};

use crate::provider::{ClientStore, Configuration, SecretStore, UserSessionManager};
use crate::registry::ProviderRegistry;
use crate::session::SessionHandle;

/// All configured collaborator providers.
pub struct Services {
    /// Configuration sources.
    pub config: ProviderRegistry<dyn Configuration>,
    /// Client stores.
    pub clients: ProviderRegistry<dyn ClientStore>,
    /// Secret stores.
    pub secrets: ProviderRegistry<dyn SecretStore>,
    /// User-session managers.
    pub sessions: ProviderRegistry<dyn UserSessionManager>,
}

impl Services {
    /// The raw configuration value for a key.
    ///
    /// # Errors
    ///
    /// [`CoreError::MissingConfig`] when no provider has the key.
    pub fn config_value(&self, key: &str) -> Result<serde_json::Value, CoreError> {
        self.config
            .find_map(|c| c.get(key))
            .ok_or_else(|| CoreError::MissingConfig(key.to_string()))
    }

    /// A configuration value that must be a string.
    pub fn config_str(&self, key: &str) -> Result<String, CoreError> {
        match self.config_value(key)? {
            serde_json::Value::String(s) => Ok(s),
            other => Err(CoreError::InvalidConfig {
                key: key.to_string(),
                reason: format!("expected a string, got {other}"),
            }),
        }
    }

    /// An optional string configuration value.
    #[must_use]
    pub fn config_str_opt(&self, key: &str) -> Option<String> {
        match self.config.find_map(|c| c.get(key)) {
            Some(serde_json::Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Resolves a client by id across all client stores.
    #[must_use]
    pub fn client_by_id(&self, client_id: &str) -> Option<Arc<dyn OAuthClient>> {
        self.clients.find_map(|store| store.client_by_id(client_id))
    }

    /// The node password from the first secret store that has one.
    pub fn node_password(&self) -> Result<String, CoreError> {
        self.secrets
            .find_map(|s| s.node_password().ok())
            .ok_or_else(|| CoreError::Secret("no node password configured".to_string()))
    }

    /// The node private key from the first secret store that has one.
    pub fn node_private_key(&self) -> Result<Vec<u8>, CoreError> {
        self.secrets
            .find_map(|s| s.node_private_key().ok())
            .ok_or_else(|| CoreError::Secret("no node private key configured".to_string()))
    }

    /// The user logged in on a session, if any manager knows one.
    #[must_use]
    pub fn logged_in(&self, session: &SessionHandle) -> Option<Arc<dyn OAuthUser>> {
        self.sessions.find_map(|m| m.logged_in(session))
    }

    /// Logs the session out of every manager.
    pub fn logout(&self, session: &SessionHandle) {
        for manager in self.sessions.iter() {
            manager.logout(session);
        }
    }

    /// Attempts a login against the managers, first match wins.
    #[must_use]
    pub fn login(
        &self,
        template: &dyn OAuthUser,
        session: &SessionHandle,
    ) -> Option<Arc<dyn OAuthUser>> {
        self.sessions.find_map(|m| m.login(template, session))
    }
}

impl ClientResolver for Services {
    fn client_by_id(&self, client_id: &str) -> Option<Arc<dyn OAuthClient>> {
        Self::client_by_id(self, client_id)
    }
}

impl KeySource for Services {
    fn jwk_set(&self, kind: TokenKeyKind) -> Result<JwkSet, CoreError> {
        self.secrets
            .find_map(|s| s.jwk_set(kind).ok())
            .ok_or_else(|| {
                CoreError::Secret(format!("no JWK set configured for {}", kind.as_str()))
            })
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("config", &self.config.len())
            .field("clients", &self.clients.len())
            .field("secrets", &self.secrets.len())
            .field("sessions", &self.sessions.len())
            .finish()
    }
}
