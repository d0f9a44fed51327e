//! Flow-level errors.

use thiserror::Error;

use op_core::CoreError;
use op_crypto::signing::CryptoError;

/// Errors from flow orchestration and the node client.
#[derive(Debug, Error)]
pub enum FlowError {
    /// A callback referenced a correlation id that is not pending.
    /// Always a client error; nothing is mutated.
    #[error("unknown correlation id")]
    UnknownCorrelation,

    /// The external node rejected the callback registration.
    #[error("callback registration rejected: {0}")]
    Registration(String),

    /// An outbound HTTP call failed.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Infrastructure failure underneath the flow.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Key loading or signing failure.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// A wire message could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
