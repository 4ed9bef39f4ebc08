//! # Agentry
//!
//! A package registry for agent and skill definitions. Organizations own named
//! packages; each published version is immutable, content-addressed by its
//! SHA-256, and verified again by the client on install.
//!
//! ## Architecture
//!
//! - [`core::tokens`]: API token issuance and constant-time verification
//! - [`core::naming`]: organization, package and version grammar
//! - [`core::checksum`]: SHA-256 content checksums
//! - [`core::publish`]: the publish coordinator
//! - [`core::resolver`]: latest/exact resolution and download descriptors
//! - [`core::store`] / [`core::blob_storage`]: metadata and object stores
//! - [`http`]: the axum API
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use agentry::{PublishRequest, RegistryService, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = RegistryService::new(ServiceConfig::with_data_dir("./data")).await?;
//!
//!     let registration = service
//!         .accounts()
//!         .register_user("dev@example.com", "dev")
//!         .await?;
//!     let user = registration.user.id;
//!     service.accounts().create_organization(user, "acme").await?;
//!
//!     let outcome = service
//!         .publish(
//!             user,
//!             PublishRequest {
//!                 org: "acme".into(),
//!                 package: "demo-agent".into(),
//!                 version: "1.0.0".into(),
//!                 content: b"hello".to_vec(),
//!                 description: None,
//!                 expected_checksum: None,
//!             },
//!         )
//!         .await?;
//!     println!("sha256 {}", outcome.record.checksum);
//!
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod http;

pub use core::config::ServerConfig;
pub use core::models::{
    ApiToken, IssuedToken, OrgRole, Organization, PackageSummary, PublishOutcome,
    PublishRequest, User, VersionDescriptor, VersionRecord,
};
pub use core::service::{FieldErrors, RegistryService, ServiceConfig, ServiceError};
pub use http::server::{build_router, RegistryServer};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging (safe for testing)
pub fn init_logging() {
    // Only initialize logging once
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "agentry=info".into());

        let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();

        // This will fail silently if already initialized
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
