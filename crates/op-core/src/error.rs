//! Core error type shared across the workspace.

use thiserror::Error;

/// Errors raised by the provider's infrastructure layers.
///
/// Protocol-level input errors have their own closed taxonomy in
/// `op-protocol`; this type covers everything underneath it: missing
/// configuration, secret material, signing machinery and transport.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A required configuration key is not set in any provider.
    #[error("missing configuration key: {0}")]
    MissingConfig(String),

    /// A configuration key is set but its value is unusable.
    #[error("invalid configuration value for {key}: {reason}")]
    InvalidConfig {
        /// The offending key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The secret store could not produce the requested material.
    #[error("secret store error: {0}")]
    Secret(String),

    /// Key selection or token signing failed.
    #[error("signing error: {0}")]
    Signing(String),

    /// An outbound network call failed.
    #[error("network error: {0}")]
    Network(String),

    /// JSON (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Anything else; the message is for operators, not end users.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
