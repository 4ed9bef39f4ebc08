//! Registry selection and client construction for CLI commands

use crate::cli::auth_config::{self, CredentialStore};
use crate::cli::error::{CliError, CliResult};
use crate::cli::utils::api_client::ApiClient;
use tracing::debug;
use url::Url;

pub const DEFAULT_REGISTRY_URL: &str = "http://localhost:8080";

/// Validate a registry URL and strip the trailing slash
pub fn normalize_registry_url(raw: &str) -> CliResult<String> {
    let parsed = Url::parse(raw.trim())
        .map_err(|e| CliError::Config(format!("Invalid registry URL '{}': {}", raw, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CliError::Config(format!(
            "Invalid registry URL '{}': scheme must be http or https",
            raw
        )));
    }
    if parsed.host_str().is_none() {
        return Err(CliError::Config(format!(
            "Invalid registry URL '{}': missing host",
            raw
        )));
    }

    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

/// Everything a network command needs
#[derive(Debug, Clone)]
pub struct ClientContext {
    pub registry_url: String,
    pub credentials: CredentialStore,
}

impl ClientContext {
    pub fn new(registry: Option<&str>, credentials: CredentialStore) -> CliResult<Self> {
        let registry_url = normalize_registry_url(registry.unwrap_or(DEFAULT_REGISTRY_URL))?;
        debug!("Using registry {}", registry_url);
        Ok(Self {
            registry_url,
            credentials,
        })
    }

    /// Client for public endpoints
    pub fn anonymous_client(&self) -> CliResult<ApiClient> {
        ApiClient::new(&self.registry_url, None)
    }

    /// Client carrying the resolved token; fails early when there is none
    pub fn authenticated_client(&self) -> CliResult<ApiClient> {
        let token = auth_config::resolve_token(&self.credentials, &self.registry_url)?
            .ok_or_else(|| CliError::NotAuthenticated(self.registry_url.clone()))?;
        ApiClient::new(&self.registry_url, Some(token))
    }
}
