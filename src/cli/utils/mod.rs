//! Shared CLI helpers

pub mod api_client;
pub mod messages;
pub mod package_ref;

pub use package_ref::PackageRef;
