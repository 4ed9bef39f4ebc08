//! Request and response models for the HTTP API

use crate::core::models::{OrgRole, PublishRequest, User, VersionDescriptor, VersionRecord};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Generic API response wrapper
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ErrorResponse>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

/// POST /api/users
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 2, max = 39, message = "Username must be 2-39 characters"))]
    pub username: String,
}

/// POST /api/tokens
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct CreateTokenRequest {
    #[validate(length(max = 100, message = "Label must be at most 100 characters"))]
    pub label: Option<String>,
}

/// POST /api/orgs
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateOrgRequest {
    #[validate(length(min = 1, message = "Organization name is required"))]
    pub name: String,
}

/// POST /api/orgs/:org/members
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AddMemberRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    /// `OWNER` or `MEMBER`; defaults to `MEMBER`
    pub role: Option<String>,
}

/// POST /api/packages
///
/// Field rules live in the publish coordinator so every violation is
/// reported together.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishBody {
    pub org: String,
    pub package: String,
    pub version: String,
    /// UTF-8 text; JSON strings cannot carry anything else
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_checksum: Option<String>,
}

impl From<PublishBody> for PublishRequest {
    fn from(body: PublishBody) -> Self {
        PublishRequest {
            org: body.org,
            package: body.package,
            version: body.version,
            content: body.content.into_bytes(),
            description: body.description,
            expected_checksum: body.expected_checksum,
        }
    }
}

/// Publish response: persisted record plus a download descriptor
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub version: VersionRecord,
    pub descriptor: VersionDescriptor,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MembershipResponse {
    pub org: String,
    pub role: OrgRole,
}

/// GET /api/me
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: User,
    pub organizations: Vec<MembershipResponse>,
}

/// GET /api/status
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub storage: String,
}
