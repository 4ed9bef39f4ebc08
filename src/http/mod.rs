//! HTTP API for the registry
//!
//! Axum router, bearer token middleware and the JSON envelope every response
//! uses.

pub mod auth;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod server;

pub use auth::AuthContext;
pub use errors::{HttpError, HttpResult};
pub use models::{ApiResponse, ErrorResponse};
pub use server::{build_router, RegistryServer};
