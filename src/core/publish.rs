//! Publish coordinator
//!
//! Ordering matters here. Content is written to the object store first under
//! a key that embeds its SHA-256, then a single metadata transaction makes the
//! version visible. The UNIQUE(package_id, version) constraint inside that
//! transaction decides every race; the earlier existence check only avoids
//! uploading content for an obviously duplicate version.

use crate::core::blob_storage::{BlobStorage, PutOutcome};
use crate::core::checksum;
use crate::core::models::{NewVersion, PublishRequest, VersionRecord};
use crate::core::naming;
use crate::core::service::{FieldErrors, ServiceError};
use crate::core::store::MetadataStore;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const MAX_DESCRIPTION_CHARS: usize = 1000;

/// Object store key for one version's content
pub fn storage_key(org_id: Uuid, package: &str, version: &str, checksum: &str) -> String {
    format!("packages/{}/{}/{}/{}", org_id, package, version, checksum)
}

pub struct Publisher {
    store: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStorage>,
    max_content_bytes: usize,
}

impl Publisher {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStorage>,
        max_content_bytes: usize,
    ) -> Self {
        Self {
            store,
            blobs,
            max_content_bytes,
        }
    }

    fn validate(&self, request: &PublishRequest) -> Result<(), ServiceError> {
        let mut errors: FieldErrors =
            naming::validate_coordinates(&request.org, &request.package, &request.version);

        if request.content.is_empty() {
            errors.add("content", "Content must not be empty");
        } else if request.content.len() > self.max_content_bytes {
            errors.add(
                "content",
                format!(
                    "Content is {} bytes; the limit is {} bytes",
                    request.content.len(),
                    self.max_content_bytes
                ),
            );
        } else if std::str::from_utf8(&request.content).is_err() {
            errors.add("content", "Content must be valid UTF-8 text");
        }

        if let Some(description) = &request.description {
            if description.chars().count() > MAX_DESCRIPTION_CHARS {
                errors.add(
                    "description",
                    format!("Description must be at most {} characters", MAX_DESCRIPTION_CHARS),
                );
            }
        }

        if let Some(expected) = &request.expected_checksum {
            if !checksum::is_checksum_format(expected) {
                errors.add("checksum", "Checksum must be 64 hex characters (SHA-256)");
            }
        }

        errors.into_result()
    }

    /// Accept a new version on behalf of `actor`
    pub async fn publish(
        &self,
        actor: Uuid,
        request: PublishRequest,
    ) -> Result<VersionRecord, ServiceError> {
        self.validate(&request)?;

        let org = self
            .store
            .find_organization(&request.org)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Organization '{}' not found", request.org))
            })?;

        let role = self.store.member_role(org.id, actor).await?;
        if !role.is_some_and(|r| r.can_publish()) {
            return Err(ServiceError::Forbidden(format!(
                "You are not a member of organization '{}'",
                org.name
            )));
        }

        let digest = checksum::checksum(&request.content);
        if let Some(expected) = &request.expected_checksum {
            if !checksum::verify(&request.content, expected) {
                return Err(ServiceError::invalid(
                    "checksum",
                    format!(
                        "Checksum mismatch: client sent {}, server computed {}",
                        expected.trim().to_ascii_lowercase(),
                        digest
                    ),
                ));
            }
        }

        if self
            .store
            .version_exists(org.id, &request.package, &request.version)
            .await?
        {
            return Err(ServiceError::Conflict(format!(
                "Version {} of {}/{} already exists",
                request.version, request.org, request.package
            )));
        }

        let key = storage_key(org.id, &request.package, &request.version, &digest);
        match self.blobs.put_if_absent(&key, &request.content).await? {
            PutOutcome::Created => debug!("Stored content at {}", key),
            // Same key means same bytes
            PutOutcome::AlreadyExists => debug!("Reusing existing content at {}", key),
        }

        let new_version = NewVersion {
            org_id: org.id,
            org: org.name.clone(),
            package: request.package.clone(),
            description: request.description.clone(),
            version: request.version.clone(),
            checksum: digest,
            size_bytes: request.content.len() as u64,
            storage_key: key.clone(),
            published_by: actor,
        };

        match self.store.commit_version(new_version).await {
            Ok(record) => {
                info!(
                    "Published {}/{}@{} ({} bytes, sha256 {})",
                    record.org, record.package, record.version, record.size_bytes, record.checksum
                );
                Ok(record)
            }
            Err(e @ ServiceError::Conflict(_)) => Err(e),
            Err(e) => {
                warn!("Publish of {} failed after content upload: {}", key, e);
                Err(e)
            }
        }
    }
}
