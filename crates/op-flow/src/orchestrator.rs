//! The authorization-flow driver.
//!
//! Owns the pending-login registry and the notification dispatcher;
//! there is no global state. `start_flow` and `callback` both return
//! promptly, with login completion delivered asynchronously through
//! the push channel or discovered by the caller's own polling.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

use op_core::config::keys;
use op_core::CoreError;
use op_protocol::claims::OAuthUser;
use op_protocol::error::InputError;
use op_protocol::request::AuthenticationRequest;
use op_protocol::response::{RenderedResponse, ResponseBuilder};
use op_spi::{AuthorizationFlow, Services, SessionHandle};

use crate::connect::{CallbackInput, CallbackRegistration, ConnectToken};
use crate::error::FlowError;
use crate::node_client::AuthenticatorClient;
use crate::notify::{logged_in_event, NotificationDispatcher, StreamItem};
use crate::registry::PendingLoginRegistry;
use crate::user::CompanionUser;

/// Probe ids used by the health check; the resolved URL templates must
/// contain them verbatim.
const PROBE_CALLBACK_ID: &str = "probe-callback";
const PROBE_WATCH_ID: &str = "probe-watch";

/// Tunable schedule of the flow.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Public base URI; callback and watch URLs hang off it.
    pub base_uri: Url,
    /// Optional base for the companion app deep link.
    pub app_link_uri: Option<Url>,
    /// Bounded retry budget for login-after-callback: attempts.
    pub retry_attempts: u32,
    /// Bounded retry budget: interval between attempts.
    pub retry_interval: Duration,
    /// Delay before the single keep-alive probe on a watch channel.
    pub keepalive_delay: Duration,
}

impl FlowConfig {
    /// Production defaults: 120 attempts of 500 ms (a minute of
    /// retrying) and a 10 s keep-alive probe.
    #[must_use]
    pub fn new(base_uri: Url) -> Self {
        Self {
            base_uri,
            app_link_uri: None,
            retry_attempts: 120,
            retry_interval: Duration::from_millis(500),
            keepalive_delay: Duration::from_secs(10),
        }
    }

    /// Reads the base and app-link URIs from configuration.
    pub fn from_services(services: &Services) -> Result<Self, CoreError> {
        let base_uri = parse_config_uri(services, keys::BASE_URI)?;
        let app_link_uri = services
            .config_str_opt(keys::APP_LINK_URI)
            .map(|raw| {
                Url::parse(&raw).map_err(|e| CoreError::InvalidConfig {
                    key: keys::APP_LINK_URI.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;
        Ok(Self {
            app_link_uri,
            ..Self::new(base_uri)
        })
    }
}

pub(crate) fn parse_config_uri(services: &Services, key: &str) -> Result<Url, CoreError> {
    let raw = services.config_str(key)?;
    Url::parse(&raw).map_err(|e| CoreError::InvalidConfig {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// State shared with the background retry workers.
struct Shared {
    services: Arc<Services>,
    builder: Arc<ResponseBuilder>,
    pending: PendingLoginRegistry,
    dispatcher: NotificationDispatcher,
}

impl Shared {
    /// Delivers the built response for a completed login, exactly once.
    ///
    /// Removing the pending entry is the gate: the first caller to
    /// remove it builds and delivers, every later caller is a no-op.
    async fn notify(
        &self,
        correlation_id: &str,
        request: &AuthenticationRequest,
        user: &dyn OAuthUser,
    ) {
        if self.pending.remove(correlation_id).is_none() {
            tracing::debug!(%correlation_id, "already notified, ignoring");
            return;
        }
        match self.builder.build(user, request) {
            Ok(rendered) => {
                let delivered = self
                    .dispatcher
                    .notify(correlation_id, logged_in_event(&rendered))
                    .await;
                if !delivered {
                    tracing::debug!(%correlation_id, "no watcher attached, result left to polling");
                }
            }
            Err(e) => {
                tracing::error!(%correlation_id, error = %e, "response build failed after login");
            }
        }
    }
}

/// Drives the out-of-band login flow end to end.
pub struct FlowOrchestrator {
    shared: Arc<Shared>,
    client: Arc<dyn AuthenticatorClient>,
    config: FlowConfig,
}

impl FlowOrchestrator {
    /// Creates an orchestrator over the given collaborators.
    #[must_use]
    pub fn new(
        services: Arc<Services>,
        client: Arc<dyn AuthenticatorClient>,
        builder: Arc<ResponseBuilder>,
        config: FlowConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                services,
                builder,
                pending: PendingLoginRegistry::new(),
                dispatcher: NotificationDispatcher::new(config.keepalive_delay),
            }),
            client,
            config,
        }
    }

    fn flow_uri(&self, leaf: &str, correlation_id: &str) -> Url {
        let mut uri = self.config.base_uri.clone();
        if let Ok(mut segments) = uri.path_segments_mut() {
            segments.pop_if_empty().push(leaf).push(correlation_id);
        }
        uri
    }

    /// The URL the node calls back on for a correlation id.
    #[must_use]
    pub fn callback_uri(&self, correlation_id: &str) -> Url {
        self.flow_uri("callback", correlation_id)
    }

    /// The URL a caller watches for a correlation id.
    #[must_use]
    pub fn watch_uri(&self, correlation_id: &str) -> Url {
        self.flow_uri("watch", correlation_id)
    }

    /// Number of currently pending logins.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.pending.len()
    }

    /// The currently pending correlation ids.
    #[must_use]
    pub fn pending_ids(&self) -> Vec<String> {
        self.shared.pending.ids()
    }

    /// Opens the watch channel for a correlation id.
    ///
    /// If the session's user is already authenticated (the callback
    /// won the race), the response is delivered immediately on the
    /// returned channel and the pending entry is cleared; otherwise a
    /// channel with keep-alive is registered.
    pub async fn watch(
        &self,
        correlation_id: &str,
        session: &SessionHandle,
    ) -> mpsc::Receiver<StreamItem> {
        if let Some(user) = self.shared.services.logged_in(session) {
            if let Some(request) = user.authentication_request().cloned() {
                let (tx, rx) = mpsc::channel(2);
                self.shared.pending.remove(correlation_id);
                match self.shared.builder.build(&*user, &request) {
                    Ok(rendered) => {
                        if tx
                            .send(StreamItem::Event(logged_in_event(&rendered)))
                            .await
                            .is_err()
                        {
                            tracing::debug!(%correlation_id, "watcher gone before delivery");
                        }
                    }
                    Err(e) => {
                        tracing::error!(%correlation_id, error = %e, "response build failed for logged-in watcher");
                    }
                }
                return rx;
            }
        }
        self.shared.dispatcher.open(correlation_id)
    }

    /// Handles the node's callback for a correlation id.
    ///
    /// Unknown ids are rejected without mutating anything. For a known
    /// id the login is attempted once; if the backing system is not
    /// yet consistent, a background worker keeps trying on the bounded
    /// schedule while this call returns immediately.
    pub async fn callback(
        &self,
        correlation_id: &str,
        input: CallbackInput,
    ) -> Result<(), FlowError> {
        let Some(pending) = self.shared.pending.get(correlation_id) else {
            return Err(FlowError::UnknownCorrelation);
        };
        let request = input.request()?;
        let template = CompanionUser::from_callback(&input)?;

        if let Some(user) = self.shared.services.login(&template, &pending.session) {
            self.shared.notify(correlation_id, &request, &*user).await;
            return Ok(());
        }

        let shared = Arc::clone(&self.shared);
        let id = correlation_id.to_string();
        let attempts = self.config.retry_attempts;
        let interval = self.config.retry_interval;
        tokio::spawn(async move {
            for attempt in 1..=attempts {
                tokio::time::sleep(interval).await;
                if !shared.pending.contains(&id) {
                    return;
                }
                if let Some(user) = shared.services.login(&template, &pending.session) {
                    tracing::debug!(correlation_id = %id, attempt, "login succeeded on retry");
                    shared.notify(&id, &request, &*user).await;
                    return;
                }
            }
            tracing::warn!(
                correlation_id = %id,
                attempts,
                "login retry budget exhausted, pending login left orphaned"
            );
        });
        Ok(())
    }

    fn login_page(&self, token: &ConnectToken, watch_uri: &Url) -> Result<String, FlowError> {
        let payload = token.qr_payload()?;
        let app_link = self
            .config
            .app_link_uri
            .as_ref()
            .map(|base| {
                format!(
                    r#"<p><a href="{}">Open the app</a></p>"#,
                    escape(token.deep_link(base).as_str())
                )
            })
            .unwrap_or_default();
        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head><title>Log in</title></head>
<body>
<div id="qr" data-payload="{payload}"></div>
{app_link}<script>
var events = new EventSource("{watch}");
events.addEventListener("loggedIn", function (e) {{
  var result = JSON.parse(e.data);
  if (result.url) {{ window.location = result.url; }}
  else {{ document.open(); document.write(result.page); document.close(); }}
}});
</script>
</body>
</html>"#,
            payload = escape(&payload),
            app_link = app_link,
            watch = escape(watch_uri.as_str()),
        ))
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[async_trait]
impl AuthorizationFlow for FlowOrchestrator {
    async fn start_flow(
        &self,
        request: &AuthenticationRequest,
        session: &SessionHandle,
    ) -> Result<Option<RenderedResponse>, InputError> {
        let correlation_id = self.shared.pending.register(session.clone());
        let body = request.to_bytes().map_err(|e| {
            tracing::error!(error = %e, "request serialization failed");
            self.shared.pending.remove(&correlation_id);
            InputError::server_error()
        })?;

        let registration = CallbackRegistration {
            callback: self.callback_uri(&correlation_id),
            body,
            metadata: serde_json::Map::new(),
        };
        let token = match self.client.register_callback(&registration).await {
            Ok(token) => token,
            Err(e) => {
                // fatal: no flow is returned, the entry is withdrawn
                self.shared.pending.remove(&correlation_id);
                tracing::error!(error = %e, "callback registration with node failed");
                return Err(InputError::server_error());
            }
        };

        let page = self
            .login_page(&token, &self.watch_uri(&correlation_id))
            .map_err(|e| {
                self.shared.pending.remove(&correlation_id);
                tracing::error!(error = %e, "login page rendering failed");
                InputError::server_error()
            })?;
        tracing::debug!(%correlation_id, "flow started");
        Ok(Some(RenderedResponse::Page(page)))
    }

    fn is_healthy(&self) -> bool {
        self.callback_uri(PROBE_CALLBACK_ID)
            .as_str()
            .contains(PROBE_CALLBACK_ID)
            && self.watch_uri(PROBE_WATCH_ID).as_str().contains(PROBE_WATCH_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_uris_hang_off_base() {
        let config = FlowConfig::new(Url::parse("https://op.example/login/").unwrap());
        assert_eq!(config.base_uri.as_str(), "https://op.example/login/");
        assert_eq!(config.retry_attempts, 120);
        assert_eq!(config.retry_interval, Duration::from_millis(500));
        assert_eq!(config.keepalive_delay, Duration::from_secs(10));
    }
}
