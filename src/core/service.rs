//! Main registry service implementation
//!
//! [`RegistryService`] is constructed once at process start. It owns the
//! metadata store and object store handles and hands them, by `Arc`, to the
//! token service, account service, publish coordinator and distribution
//! resolver.

use crate::core::accounts::AccountService;
use crate::core::blob_storage::{create_blob_storage, BlobStorage, BlobStorageConfig};
use crate::core::models::{PublishOutcome, PublishRequest};
use crate::core::publish::Publisher;
use crate::core::resolver::Resolver;
use crate::core::store::{MetadataStore, SqliteStore};
use crate::core::tickets::TicketService;
use crate::core::tokens::TokenService;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Default upper bound for a single version's content
pub const DEFAULT_MAX_CONTENT_BYTES: usize = 1024 * 1024;

/// Main service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base directory for registry state
    pub data_dir: PathBuf,

    /// SQLite database file (defaults to `<data_dir>/registry.db`)
    pub database_path: Option<PathBuf>,

    /// Object store configuration
    pub blob_storage: BlobStorageConfig,

    /// Externally visible base URL, used to build download links
    pub public_base_url: String,

    /// HMAC secret for download tickets. Generated per process when empty.
    pub download_ticket_secret: String,

    /// Lifetime of a download ticket (seconds)
    pub download_ticket_ttl_secs: u64,

    /// Maximum accepted content size for a version (bytes)
    pub max_content_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            database_path: None,
            blob_storage: BlobStorageConfig::default(),
            public_base_url: "http://localhost:8080".to_string(),
            download_ticket_secret: String::new(),
            download_ticket_ttl_secs: 900,
            max_content_bytes: DEFAULT_MAX_CONTENT_BYTES,
        }
    }
}

impl ServiceConfig {
    /// Config rooted at `data_dir`, everything else default
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    pub fn resolved_database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("registry.db"))
    }

    pub fn resolved_object_path(&self) -> PathBuf {
        self.blob_storage
            .base_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("objects"))
    }
}

/// Field name to messages, ordered for stable output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok(())` when nothing was recorded, otherwise a validation error
    pub fn into_result(self) -> Result<(), ServiceError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(self))
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join("; ")))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Main service error type
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Invalid or missing credentials")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    Integrity { expected: String, actual: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// Single-field validation error
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        ServiceError::Validation(errors)
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "VALIDATION_ERROR",
            ServiceError::Unauthorized => "UNAUTHORIZED",
            ServiceError::Forbidden(_) => "FORBIDDEN",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::Conflict(_) => "CONFLICT",
            ServiceError::Integrity { .. } => "INTEGRITY_ERROR",
            ServiceError::Storage(_)
            | ServiceError::Database(_)
            | ServiceError::Config(_)
            | ServiceError::Io(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

/// Registry service: wiring for every core component
pub struct RegistryService {
    config: ServiceConfig,
    store: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStorage>,
    tokens: Arc<TokenService>,
    accounts: Arc<AccountService>,
    publisher: Arc<Publisher>,
    resolver: Arc<Resolver>,
}

impl RegistryService {
    /// Open the configured SQLite store and object store
    pub async fn new(config: ServiceConfig) -> Result<Self, ServiceError> {
        tokio::fs::create_dir_all(&config.data_dir).await?;

        let db_path = config.resolved_database_path();
        info!("Opening metadata store at {}", db_path.display());
        let store: Arc<dyn MetadataStore> = Arc::new(SqliteStore::open(db_path).await?);

        let blobs = create_blob_storage(&config).await?;

        Self::with_backends(config, store, blobs)
    }

    /// Build the service around explicit store and object store handles
    pub fn with_backends(
        config: ServiceConfig,
        store: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStorage>,
    ) -> Result<Self, ServiceError> {
        let secret = if config.download_ticket_secret.is_empty() {
            warn!("No download ticket secret configured; generating an ephemeral one");
            crate::core::tokens::generate_secret()
        } else {
            config.download_ticket_secret.clone()
        };
        let tickets = Arc::new(TicketService::new(
            &secret,
            config.download_ticket_ttl_secs,
        ));

        let tokens = Arc::new(TokenService::new(store.clone()));
        let accounts = Arc::new(AccountService::new(store.clone(), tokens.clone()));
        let publisher = Arc::new(Publisher::new(
            store.clone(),
            blobs.clone(),
            config.max_content_bytes,
        ));
        let resolver = Arc::new(Resolver::new(
            store.clone(),
            blobs.clone(),
            tickets,
            &config.public_base_url,
        ));

        Ok(Self {
            config,
            store,
            blobs,
            tokens,
            accounts,
            publisher,
            resolver,
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn MetadataStore> {
        &self.store
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStorage> {
        &self.blobs
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Publish a version and describe it for download
    pub async fn publish(
        &self,
        actor: Uuid,
        request: PublishRequest,
    ) -> Result<PublishOutcome, ServiceError> {
        let record = self.publisher.publish(actor, request).await?;
        let descriptor = self.resolver.describe(&record)?;
        Ok(PublishOutcome { record, descriptor })
    }
}
