//! Shared core types for the OpenID provider.
//!
//! Everything here is consumed by every other crate in the workspace:
//! the common error type and the well-known configuration keys.

pub mod config;
pub mod error;

pub use error::{CoreError, CoreResult};
