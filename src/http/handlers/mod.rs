//! HTTP request handlers

pub mod download;
pub mod orgs;
pub mod packages;
pub mod status;
pub mod tokens;
pub mod users;

pub use status::AppState;
