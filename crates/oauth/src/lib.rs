pub mod endpoints;
pub mod error;
pub mod flow;
pub mod state;
pub mod storage;
pub mod types;

pub use {
    endpoints::{Endpoints, resolve_endpoints},
    error::OAuthError,
    flow::{AuthorizedSession, OAuthClient},
    storage::{CredentialRecord, CredentialStore},
    types::{Environment, TokenResponse},
};
