//! Out-of-band login orchestration.
//!
//! The flow: a validated authentication request is registered under a
//! random correlation id, the external authenticator node is told
//! where to call back, and the user agent gets a login page that
//! watches a push channel. When the node calls back, the login is
//! replayed against the session managers (with a bounded retry while
//! the backing system catches up) and the finished authentication
//! response is pushed to the watcher, exactly once.

pub mod authorize;
pub mod connect;
pub mod error;
pub mod node_client;
pub mod notify;
pub mod orchestrator;
pub mod registry;
pub mod user;

pub use authorize::{Authorizer, AuthorizeOutcome};
pub use connect::{CallbackInput, CallbackRegistration, ConnectToken};
pub use error::FlowError;
pub use node_client::{AuthenticatorClient, NodeClient, NodeConfig};
pub use notify::{logged_in_event, NotificationDispatcher, PushEvent, StreamItem};
pub use orchestrator::{FlowConfig, FlowOrchestrator};
pub use registry::{PendingLogin, PendingLoginRegistry};
pub use user::CompanionUser;
