//! Gateway: the HTTP server phones upload photos to and the operator drives
//! listings from.
//!
//! Lifecycle:
//! 1. Load config, resolve the LAN host used in image URLs
//! 2. Open the credential, defaults and upload stores
//! 3. Serve uploads, account endpoints, the publish endpoint and the web UI
//!
//! OAuth and listing logic live in `snaplist-oauth` and `snaplist-listing`;
//! handlers only translate between HTTP and those crates.

pub mod ebay;
pub mod error;
pub mod net;
pub mod server;
pub mod settings;
pub mod state;
pub mod uploads;

pub use {
    error::{ApiError, ApiResult},
    server::{build_gateway_app, start_gateway},
    state::GatewayState,
    uploads::UploadStore,
};
