//! Core registry modules

pub mod accounts;
pub mod blob_storage;
pub mod checksum;
pub mod config;
pub mod models;
pub mod naming;
pub mod publish;
pub mod resolver;
pub mod service;
pub mod store;
pub mod tickets;
pub mod tokens;

// Re-export main types for convenience
pub use accounts::{AccountService, Registration};
pub use blob_storage::{create_blob_storage, BlobStorage, BlobStorageConfig, LocalBlobStorage, PutOutcome};
pub use config::ServerConfig;
pub use models::*;
pub use publish::Publisher;
pub use resolver::Resolver;
pub use service::{FieldErrors, RegistryService, ServiceConfig, ServiceError};
pub use store::{MetadataStore, SqliteStore};
pub use tickets::{TicketClaims, TicketService};
pub use tokens::TokenService;
