//! Bearer token authentication

pub mod middleware;

pub use middleware::{auth_middleware, AuthContext};
