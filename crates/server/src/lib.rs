//! REST protocol front-end for content-addressed backup repositories.
//!
//! This crate provides the HTTP surface:
//! - Config check/get/save/delete
//! - Blob check/get/save/delete with sharding for pack data
//! - Listing in the v2 JSON format
//! - Repository creation
//! - Basic authentication and Prometheus counters

pub mod auth;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use auth::{AuthUser, CredentialFile, CredentialStore};
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
