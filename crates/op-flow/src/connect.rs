//! Wire messages exchanged with the external authenticator node.

use serde::{Deserialize, Serialize};
use url::Url;

use op_protocol::request::AuthenticationRequest;

/// Serde adapter: opaque byte payloads travel as standard base64.
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(&encoded).map_err(serde::de::Error::custom)
    }
}

/// Connect token returned by a successful callback registration.
///
/// Its JSON form is the QR payload; it is also renderable as an app
/// deep link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectToken {
    /// Where the companion app should connect.
    pub target: Url,

    /// One-time secret for establishing the connection.
    #[serde(rename = "tmpSecret")]
    pub tmp_secret: String,

    /// Identifier of the pending connection.
    pub identifier: String,
}

impl ConnectToken {
    /// The JSON payload a QR renderer encodes.
    pub fn qr_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// A deep link opening the companion app directly.
    #[must_use]
    pub fn deep_link(&self, base: &Url) -> Url {
        let mut link = base.clone();
        link.query_pairs_mut()
            .append_pair("target", self.target.as_str())
            .append_pair("tmpSecret", &self.tmp_secret)
            .append_pair("identifier", &self.identifier)
            .finish();
        link
    }
}

/// Payload posted to the node to register a callback.
///
/// The echoed body carries the serialized authentication request, so no
/// server-side flow state is needed beyond the correlation id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackRegistration {
    /// Where the node calls back once the user connects.
    pub callback: Url,

    /// Opaque body the node echoes back verbatim.
    #[serde(with = "base64_bytes")]
    pub body: Vec<u8>,

    /// Profile-sharing metadata merged in from the card-message
    /// endpoint, when available.
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Inbound callback payload from the node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackInput {
    /// Persistent subject identifier of the connecting user.
    pub pid: String,

    /// URI of the established connection.
    pub connection: Url,

    /// The echoed body from the registration.
    #[serde(with = "base64_bytes")]
    pub body: Vec<u8>,
}

impl CallbackInput {
    /// Deserializes the echoed authentication request.
    pub fn request(&self) -> Result<AuthenticationRequest, serde_json::Error> {
        AuthenticationRequest::from_bytes(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_token_wire_shape() {
        let token = ConnectToken {
            target: Url::parse("https://node.example/connect/abc").unwrap(),
            tmp_secret: "s3cret".to_string(),
            identifier: "conn-1".to_string(),
        };
        let json: serde_json::Value = serde_json::from_str(&token.qr_payload().unwrap()).unwrap();
        assert_eq!(json["target"], "https://node.example/connect/abc");
        assert_eq!(json["tmpSecret"], "s3cret");
        assert_eq!(json["identifier"], "conn-1");
    }

    #[test]
    fn deep_link_carries_token_fields() {
        let token = ConnectToken {
            target: Url::parse("https://node.example/connect/abc").unwrap(),
            tmp_secret: "s3cret".to_string(),
            identifier: "conn-1".to_string(),
        };
        let base = Url::parse("https://app.example/connect").unwrap();
        let link = token.deep_link(&base);
        let query = link.query().unwrap();
        assert!(query.contains("tmpSecret=s3cret"));
        assert!(query.contains("identifier=conn-1"));
    }

    #[test]
    fn callback_body_travels_as_base64() {
        let input = CallbackInput {
            pid: "subject-1".to_string(),
            connection: Url::parse("https://node.example/connections/1").unwrap(),
            body: b"opaque".to_vec(),
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["body"], "b3BhcXVl");

        let restored: CallbackInput = serde_json::from_value(json).unwrap();
        assert_eq!(restored.body, b"opaque");
    }

    #[test]
    fn registration_flattens_metadata() {
        let mut metadata = serde_json::Map::new();
        metadata.insert("cardMsg".to_string(), serde_json::json!("share your name"));
        let registration = CallbackRegistration {
            callback: Url::parse("https://op.example/callback/id-1").unwrap(),
            body: b"{}".to_vec(),
            metadata,
        };
        let json = serde_json::to_value(&registration).unwrap();
        assert_eq!(json["cardMsg"], "share your name");
        assert_eq!(json["callback"], "https://op.example/callback/id-1");
    }
}
