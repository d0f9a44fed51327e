//! Authentication request/response protocol engine.
//!
//! Parses raw authorization parameters into a validated
//! [`request::AuthenticationRequest`], derives the flow, and once a
//! user is authenticated builds a signed response delivered according
//! to the negotiated response mode.

pub mod claims;
pub mod discovery;
pub mod error;
pub mod request;
pub mod response;
pub mod token;
pub mod types;

pub use claims::{AddressClaim, IdTokenClaims, OAuthUser, StandardClaims};
pub use discovery::ProviderMetadata;
pub use error::{ErrorCode, ErrorDisposition, ErrorResponse, ErrorTarget, InputError};
pub use request::{AuthenticationRequest, ClientResolver, OAuthClient, ParseFailure, RawParams};
pub use response::{
    BearerStore, CodeIssuer, InMemoryBearerStore, RenderedResponse, ResponseBuilder,
};
pub use token::{KeySource, TokenKeyKind, TokenSigner};
pub use types::{Display, Flow, LanguageTag, Prompt, ResponseMode, ResponseType, SubjectType};
