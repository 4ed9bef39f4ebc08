//! Server configuration loading
//!
//! Sources, later ones winning: built-in defaults, `agentry.toml` (or the file
//! passed explicitly), then `AGENTRY__*` environment variables with `__` as the
//! nesting separator, e.g. `AGENTRY__REGISTRY__DATA_DIR=/var/lib/agentry`.

use crate::core::service::{ServiceConfig, ServiceError};
use config::{Config as Cfg, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty means any
    pub cors_origins: Vec<String>,
    pub registry: ServiceConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
            registry: ServiceConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from an optional file plus the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ServiceError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("agentry").required(false),
        };

        let config = Cfg::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("AGENTRY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ServiceError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| ServiceError::Config(e.to_string()))
    }
}
