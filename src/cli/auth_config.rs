//! Credential storage for the CLI
//! Keeps one API token per registry in `<config_dir>/agentry/credentials.toml`

use crate::cli::error::{CliError, CliResult};
use chrono::{DateTime, Utc};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Overrides the directory holding `credentials.toml`
pub const CONFIG_DIR_ENV: &str = "AGENTRY_CONFIG_DIR";

/// Token taking precedence over anything stored
pub const TOKEN_ENV: &str = "AGENTRY_TOKEN";

const CREDENTIALS_FILE: &str = "credentials.toml";

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialsFile {
    #[serde(default)]
    registry: BTreeMap<String, RegistryCredentials>,
}

/// Stored credentials for one registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryCredentials {
    pub token: String,
    pub username: Option<String>,
    pub saved_at: DateTime<Utc>,
}

/// TOML-backed credential file
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$AGENTRY_CONFIG_DIR/credentials.toml`, else the platform config directory
    pub fn default_location() -> CliResult<Self> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            return Ok(Self::new(PathBuf::from(dir).join(CREDENTIALS_FILE)));
        }

        let config_dir = config_dir()
            .ok_or_else(|| CliError::Config("Failed to determine config directory".to_string()))?;
        Ok(Self::new(config_dir.join("agentry").join(CREDENTIALS_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> CliResult<CredentialsFile> {
        if !self.path.exists() {
            return Ok(CredentialsFile::default());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            CliError::Config(format!(
                "Failed to read credentials file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        toml::from_str(&content).map_err(|e| {
            CliError::Config(format!(
                "Failed to parse credentials file {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Replace the file atomically; the temp file is created owner-only on unix
    fn save(&self, file: &CredentialsFile) -> CliResult<()> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| CliError::Config("Invalid credentials path".to_string()))?;
        fs::create_dir_all(dir)
            .map_err(|e| CliError::Config(format!("Failed to create config directory: {}", e)))?;

        let content = toml::to_string_pretty(file)
            .map_err(|e| CliError::Config(format!("Failed to serialize credentials: {}", e)))?;

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(content.as_bytes())?;
        temp.as_file().sync_all()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(temp.path(), fs::Permissions::from_mode(0o600))?;
        }

        temp.persist(&self.path).map_err(|e| {
            CliError::Config(format!(
                "Failed to write credentials file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(())
    }

    pub fn get(&self, registry_url: &str) -> CliResult<Option<RegistryCredentials>> {
        Ok(self.load()?.registry.remove(registry_url))
    }

    pub fn set(&self, registry_url: &str, token: &str, username: Option<String>) -> CliResult<()> {
        let mut file = self.load()?;
        file.registry.insert(
            registry_url.to_string(),
            RegistryCredentials {
                token: token.to_string(),
                username,
                saved_at: Utc::now(),
            },
        );
        self.save(&file)
    }

    /// Returns whether anything was stored for the registry
    pub fn remove(&self, registry_url: &str) -> CliResult<bool> {
        let mut file = self.load()?;
        let removed = file.registry.remove(registry_url).is_some();
        if removed {
            self.save(&file)?;
        }
        Ok(removed)
    }
}

/// Environment token first, then the stored one
pub fn pick_token(env_token: Option<String>, stored: Option<RegistryCredentials>) -> Option<String> {
    env_token
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .or_else(|| stored.map(|credentials| credentials.token))
}

/// Resolve the token to use for `registry_url`
pub fn resolve_token(store: &CredentialStore, registry_url: &str) -> CliResult<Option<String>> {
    let stored = store.get(registry_url)?;
    Ok(pick_token(std::env::var(TOKEN_ENV).ok(), stored))
}
