//! Distribution resolver: version lookup and download descriptors

use crate::core::blob_storage::BlobStorage;
use crate::core::checksum;
use crate::core::models::{Organization, PackageSummary, VersionDescriptor, VersionRecord};
use crate::core::naming;
use crate::core::service::ServiceError;
use crate::core::store::MetadataStore;
use crate::core::tickets::{TicketClaims, TicketService};
use std::sync::Arc;
use tracing::error;

/// Highest version by numeric (major, minor, patch) order
pub fn latest_of(records: &[VersionRecord]) -> Option<&VersionRecord> {
    records
        .iter()
        .filter_map(|r| semver::Version::parse(&r.version).ok().map(|v| (v, r)))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, r)| r)
}

/// Sort newest first by numeric version order
fn sort_newest_first(records: &mut [VersionRecord]) {
    records.sort_by(|a, b| {
        let va = semver::Version::parse(&a.version).ok();
        let vb = semver::Version::parse(&b.version).ok();
        vb.cmp(&va)
    });
}

pub struct Resolver {
    store: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStorage>,
    tickets: Arc<TicketService>,
    public_base_url: String,
}

impl Resolver {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStorage>,
        tickets: Arc<TicketService>,
        public_base_url: &str,
    ) -> Self {
        Self {
            store,
            blobs,
            tickets,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Descriptor with a fresh download ticket. Never carries content.
    pub fn describe(&self, record: &VersionRecord) -> Result<VersionDescriptor, ServiceError> {
        let (ticket, expires_at) = self.tickets.issue(record)?;
        Ok(VersionDescriptor {
            org: record.org.clone(),
            package: record.package.clone(),
            version: record.version.clone(),
            checksum: record.checksum.clone(),
            size_bytes: record.size_bytes,
            published_at: record.created_at,
            published_by: record.published_by,
            download_url: format!("{}/api/download/{}", self.public_base_url, ticket),
            expires_at,
        })
    }

    async fn organization(&self, org: &str) -> Result<Organization, ServiceError> {
        self.store
            .find_organization(org)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Organization '{}' not found", org)))
    }

    async fn versions_of(
        &self,
        org: &str,
        package: &str,
    ) -> Result<Vec<VersionRecord>, ServiceError> {
        naming::validate_package_ref(org, package)?;
        let organization = self.organization(org).await?;
        let records = self.store.list_versions(organization.id, package).await?;
        if records.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "Package '{}/{}' not found",
                org, package
            )));
        }
        Ok(records)
    }

    pub async fn resolve_latest(
        &self,
        org: &str,
        package: &str,
    ) -> Result<VersionDescriptor, ServiceError> {
        let records = self.versions_of(org, package).await?;
        let latest = latest_of(&records).ok_or_else(|| {
            ServiceError::NotFound(format!("Package '{}/{}' has no versions", org, package))
        })?;
        self.describe(latest)
    }

    pub async fn resolve_exact(
        &self,
        org: &str,
        package: &str,
        version: &str,
    ) -> Result<VersionDescriptor, ServiceError> {
        naming::validate_coordinates(org, package, version).into_result()?;

        let organization = self.organization(org).await?;
        let record = self
            .store
            .find_version(organization.id, package, version)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Version {} of '{}/{}' not found",
                    version, org, package
                ))
            })?;
        self.describe(&record)
    }

    /// All versions, newest first
    pub async fn list_versions(
        &self,
        org: &str,
        package: &str,
    ) -> Result<Vec<VersionDescriptor>, ServiceError> {
        let mut records = self.versions_of(org, package).await?;
        sort_newest_first(&mut records);
        records.iter().map(|r| self.describe(r)).collect()
    }

    pub async fn list_packages(&self, org: &str) -> Result<Vec<PackageSummary>, ServiceError> {
        naming::validate_org_name(org)?;
        let organization = self.organization(org).await?;
        let packages = self.store.list_packages(organization.id).await?;

        let version_lists = futures::future::try_join_all(
            packages
                .iter()
                .map(|p| self.store.list_versions(organization.id, &p.name)),
        )
        .await?;

        Ok(packages
            .into_iter()
            .zip(version_lists)
            .map(|(package, versions)| PackageSummary {
                org: organization.name.clone(),
                latest_version: latest_of(&versions).map(|r| r.version.clone()),
                version_count: versions.len(),
                name: package.name,
                description: package.description,
                created_at: package.created_at,
            })
            .collect())
    }

    /// Resolve a download ticket to its content.
    ///
    /// The bytes are re-hashed before they leave the server; a mismatch with
    /// the recorded checksum is reported instead of serving corrupt content.
    pub async fn fetch_by_ticket(
        &self,
        ticket: &str,
    ) -> Result<(TicketClaims, Vec<u8>), ServiceError> {
        let claims = self.tickets.validate(ticket)?;
        let content = self.blobs.get(&claims.sub).await?;

        let actual = checksum::checksum(&content);
        if !checksum::verify(&content, &claims.sha) {
            error!(
                "Stored content for {}/{}@{} does not match its checksum",
                claims.org, claims.pkg, claims.ver
            );
            return Err(ServiceError::Integrity {
                expected: claims.sha,
                actual,
            });
        }
        Ok((claims, content))
    }
}
