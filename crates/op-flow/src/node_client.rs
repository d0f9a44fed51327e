//! HTTP client for the external authenticator node.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use url::Url;

use op_core::config::keys;
use op_crypto::signing::{
    authorization_header, canonical_signing_input, NodeSignatureAlgorithm, RequestSigner,
};
use op_spi::Services;

use crate::connect::{CallbackRegistration, ConnectToken};
use crate::error::FlowError;

/// Header carrying the shared node password.
pub const NODE_PASSWORD_HEADER: &str = "password";

/// Registers callbacks with the external authenticator.
///
/// Abstracted so the orchestrator can be driven without a live node.
#[async_trait]
pub trait AuthenticatorClient: Send + Sync {
    /// Posts a callback registration, returning the connect token.
    async fn register_callback(
        &self,
        registration: &CallbackRegistration,
    ) -> Result<ConnectToken, FlowError>;
}

/// Static configuration of the node client.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// This provider's node identifier.
    pub node_id: String,
    /// Registration endpoint at the node.
    pub register_uri: Url,
    /// Optional card-message endpoint for profile-sharing metadata.
    pub card_message_uri: Option<Url>,
    /// Shared node password, sent as a header.
    pub password: String,
    /// Signature algorithm for outbound request authentication.
    pub algorithm: NodeSignatureAlgorithm,
}

/// The production [`AuthenticatorClient`], talking HTTP to the node.
pub struct NodeClient {
    http: reqwest::Client,
    config: NodeConfig,
    signer: RequestSigner,
}

impl NodeClient {
    /// Creates a client from explicit configuration and a PKCS#8 DER
    /// private key.
    pub fn new(config: NodeConfig, private_key_der: &[u8]) -> Result<Self, FlowError> {
        let signer = RequestSigner::from_pkcs8(config.algorithm, private_key_der)?;
        Ok(Self {
            http: reqwest::Client::new(),
            config,
            signer,
        })
    }

    /// Wires a client from the configured collaborators.
    pub fn from_services(services: &Services) -> Result<Self, FlowError> {
        let register_uri = parse_uri(services, keys::REGISTER_CALLBACK_URI)?;
        let card_message_uri = services
            .config_str_opt(keys::CARD_MESSAGE_URI)
            .map(|raw| {
                Url::parse(&raw).map_err(|e| {
                    FlowError::Core(op_core::CoreError::InvalidConfig {
                        key: keys::CARD_MESSAGE_URI.to_string(),
                        reason: e.to_string(),
                    })
                })
            })
            .transpose()?;
        let algorithm = NodeSignatureAlgorithm::from_str(
            &services.config_str(keys::SIGNATURE_ALGORITHM)?,
        )?;
        let config = NodeConfig {
            node_id: services.config_str(keys::NODE_ID)?,
            register_uri,
            card_message_uri,
            password: services.node_password()?,
            algorithm,
        };
        let key = services.node_private_key()?;
        Self::new(config, &key)
    }

    /// Builds the authorization header for a request body: a signature
    /// over node-id, a millisecond-timestamp nonce and the body.
    fn auth_header(&self, body: &[u8]) -> Result<String, FlowError> {
        let nonce = Utc::now().timestamp_millis().to_string();
        let input = canonical_signing_input(&self.config.node_id, &nonce, body);
        let signature = self.signer.sign(&input)?;
        Ok(authorization_header(&self.config.node_id, &nonce, &signature))
    }

    /// Fetches profile-sharing metadata, best-effort: a failure is
    /// logged and ignored, never fatal.
    async fn card_message(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        let uri = self.config.card_message_uri.as_ref()?;
        let result = async {
            self.http
                .get(uri.clone())
                .send()
                .await?
                .error_for_status()?
                .json::<serde_json::Map<String, serde_json::Value>>()
                .await
        }
        .await;
        match result {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                tracing::warn!(error = %e, "card message fetch failed, continuing without");
                None
            }
        }
    }
}

#[async_trait]
impl AuthenticatorClient for NodeClient {
    async fn register_callback(
        &self,
        registration: &CallbackRegistration,
    ) -> Result<ConnectToken, FlowError> {
        let mut registration = registration.clone();
        if let Some(metadata) = self.card_message().await {
            registration.metadata.extend(metadata);
        }

        let body = serde_json::to_vec(&registration)?;
        let authorization = self.auth_header(&body)?;

        let response = self
            .http
            .post(self.config.register_uri.clone())
            .header(reqwest::header::AUTHORIZATION, authorization)
            .header(NODE_PASSWORD_HEADER, &self.config.password)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FlowError::Registration(format!(
                "node answered {status} to callback registration"
            )));
        }
        Ok(response.json::<ConnectToken>().await?)
    }
}

fn parse_uri(services: &Services, key: &str) -> Result<Url, FlowError> {
    let raw = services.config_str(key)?;
    Url::parse(&raw).map_err(|e| {
        FlowError::Core(op_core::CoreError::InvalidConfig {
            key: key.to_string(),
            reason: e.to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_lc_rs::rand::SystemRandom;
    use aws_lc_rs::signature::Ed25519KeyPair;

    fn client() -> NodeClient {
        let rng = SystemRandom::new();
        let doc = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
        NodeClient::new(
            NodeConfig {
                node_id: "node-1".to_string(),
                register_uri: Url::parse("https://node.example/register").unwrap(),
                card_message_uri: None,
                password: "hunter2".to_string(),
                algorithm: NodeSignatureAlgorithm::Ed25519,
            },
            doc.as_ref(),
        )
        .unwrap()
    }

    #[test]
    fn auth_header_shape() {
        let header = client().auth_header(b"{}").unwrap();
        let mut parts = header.split(' ');
        assert_eq!(parts.next(), Some("Node"));
        assert_eq!(parts.next(), Some("node-1"));
        let nonce_and_sig = parts.next().unwrap();
        let (nonce, sig) = nonce_and_sig.split_once(':').unwrap();
        assert!(nonce.bytes().all(|b| b.is_ascii_digit()));
        assert!(!sig.is_empty());
    }
}
