//! Registry data model

use crate::core::service::ServiceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Role of a user inside an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrgRole {
    Owner,
    Member,
}

impl OrgRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgRole::Owner => "OWNER",
            OrgRole::Member => "MEMBER",
        }
    }

    /// Both roles may publish
    pub fn can_publish(&self) -> bool {
        matches!(self, OrgRole::Owner | OrgRole::Member)
    }

    pub fn can_manage_members(&self) -> bool {
        matches!(self, OrgRole::Owner)
    }
}

impl std::str::FromStr for OrgRole {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OWNER" => Ok(OrgRole::Owner),
            "MEMBER" => Ok(OrgRole::Member),
            _ => Err(ServiceError::invalid(
                "role",
                format!("Invalid role '{}', expected OWNER or MEMBER", s),
            )),
        }
    }
}

impl std::fmt::Display for OrgRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// API token metadata. The secret itself is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Token row as persisted, including the SHA-256 of the secret
#[derive(Debug, Clone)]
pub struct StoredToken {
    pub token: ApiToken,
    pub token_hash: String,
}

/// Freshly issued token. `raw_token` is shown to the caller once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub raw_token: String,
    pub token: ApiToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Persisted version of a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    pub id: Uuid,
    pub package_id: Uuid,
    pub org: String,
    pub package: String,
    pub version: String,
    pub checksum: String,
    pub size_bytes: u64,
    pub storage_key: String,
    pub published_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Everything a client needs to fetch and verify one version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDescriptor {
    pub org: String,
    pub package: String,
    pub version: String,
    pub checksum: String,
    pub size_bytes: u64,
    pub published_at: DateTime<Utc>,
    pub published_by: Uuid,
    pub download_url: String,
    pub expires_at: DateTime<Utc>,
}

/// Listing entry for a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSummary {
    pub org: String,
    pub name: String,
    pub description: Option<String>,
    pub latest_version: Option<String>,
    pub version_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Input to the publish coordinator
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub org: String,
    pub package: String,
    pub version: String,
    pub content: Vec<u8>,
    pub description: Option<String>,
    /// Client-computed checksum, used only as a pre-check
    pub expected_checksum: Option<String>,
}

/// Row set committed by one publish
#[derive(Debug, Clone)]
pub struct NewVersion {
    pub org_id: Uuid,
    pub org: String,
    pub package: String,
    pub description: Option<String>,
    pub version: String,
    pub checksum: String,
    pub size_bytes: u64,
    pub storage_key: String,
    pub published_by: Uuid,
}

/// Result of a successful publish
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOutcome {
    pub record: VersionRecord,
    pub descriptor: VersionDescriptor,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("owner".parse::<OrgRole>().unwrap(), OrgRole::Owner);
        assert_eq!("MEMBER".parse::<OrgRole>().unwrap(), OrgRole::Member);
        assert!("admin".parse::<OrgRole>().is_err());
    }

    #[test]
    fn test_role_serializes_upper_case() {
        let json = serde_json::to_string(&OrgRole::Member).unwrap();
        assert_eq!(json, "\"MEMBER\"");
    }
}
