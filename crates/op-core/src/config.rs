//! Well-known configuration keys.
//!
//! Configuration values are supplied by `Configuration` providers (see
//! `op-spi`); the keys themselves are fixed and shared across the
//! workspace so every crate agrees on spelling.

/// Configuration keys consumed by the provider core.
pub mod keys {
    /// Issuer identifier placed in the `iss` claim of every ID Token.
    pub const ISSUER: &str = "iss";

    /// Public base URI of this provider; callback and watch URLs are
    /// derived from it.
    pub const BASE_URI: &str = "baseUri";

    /// Identifier of this provider's node at the external authenticator.
    pub const NODE_ID: &str = "nodeId";

    /// Endpoint at the external authenticator where callback
    /// registrations are posted.
    pub const REGISTER_CALLBACK_URI: &str = "registerCallbackUri";

    /// Algorithm name for signing outbound node requests.
    pub const SIGNATURE_ALGORITHM: &str = "signature";

    /// Optional endpoint returning profile-sharing metadata merged into
    /// callback registrations.
    pub const CARD_MESSAGE_URI: &str = "cardMessageUri";

    /// Optional base URI for the companion app deep link shown on the
    /// login page.
    pub const APP_LINK_URI: &str = "appLinkUri";
}
