//! Collaborator interfaces consumed by the provider core.
//!
//! Implementations (backed by files, databases, session stores) live
//! outside this workspace; the contracts here are what the core binds
//! to. The [`registry::ProviderRegistry`] replaces runtime service
//! discovery with an explicit, priority-ordered list configured at
//! startup.

pub mod provider;
pub mod registry;
pub mod services;
pub mod session;

pub use provider::{
    AuthorizationFlow, ClientStore, Configuration, SecretStore, UserSessionManager,
};
pub use registry::ProviderRegistry;
pub use services::Services;
pub use session::SessionHandle;
