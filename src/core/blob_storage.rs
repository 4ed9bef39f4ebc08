//! Object store abstraction for version content
//!
//! Keys are written once. `put_if_absent` never replaces an existing object,
//! and callers decide what an existing key means for them.

use crate::core::service::{ServiceConfig, ServiceError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of a write-once upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Created,
    AlreadyExists,
}

/// Trait for object store backends
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store `data` under `key` unless the key is already taken
    async fn put_if_absent(&self, key: &str, data: &[u8]) -> Result<PutOutcome, ServiceError>;

    /// Read an object; a missing key is `NotFound`
    async fn get(&self, key: &str) -> Result<Vec<u8>, ServiceError>;

    /// Backend name for status output
    fn kind(&self) -> &'static str;
}

/// Reject keys that could leave the storage root
fn resolve_key(root: &Path, key: &str) -> Result<PathBuf, ServiceError> {
    if key.is_empty() || key.contains('\\') {
        return Err(ServiceError::Storage(format!("Invalid object key '{}'", key)));
    }
    let relative = Path::new(key);
    for component in relative.components() {
        match component {
            Component::Normal(_) => {}
            _ => {
                return Err(ServiceError::Storage(format!(
                    "Object key '{}' contains a forbidden path component",
                    key
                )))
            }
        }
    }
    Ok(root.join(relative))
}

/// Local filesystem object store
pub struct LocalBlobStorage {
    base_path: PathBuf,
}

impl LocalBlobStorage {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }
}

#[async_trait]
impl BlobStorage for LocalBlobStorage {
    async fn put_if_absent(&self, key: &str, data: &[u8]) -> Result<PutOutcome, ServiceError> {
        let full_path = resolve_key(&self.base_path, key)?;
        let parent = full_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.base_path.clone());
        tokio::fs::create_dir_all(&parent).await?;

        let data = data.to_vec();
        let outcome = tokio::task::spawn_blocking(move || -> Result<PutOutcome, ServiceError> {
            // Stage next to the target so the final link stays on one filesystem
            let mut staged = tempfile::NamedTempFile::new_in(&parent)?;
            staged.write_all(&data)?;
            staged.as_file().sync_all()?;

            match staged.persist_noclobber(&full_path) {
                Ok(_) => Ok(PutOutcome::Created),
                Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                    Ok(PutOutcome::AlreadyExists)
                }
                Err(e) => Err(ServiceError::Io(e.error)),
            }
        })
        .await
        .map_err(|e| ServiceError::Storage(format!("Object write task failed: {}", e)))??;

        debug!("put_if_absent {} -> {:?}", key, outcome);
        Ok(outcome)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ServiceError> {
        let full_path = resolve_key(&self.base_path, key)?;
        match tokio::fs::read(&full_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ServiceError::NotFound(format!("Object not found: {}", key)))
            }
            Err(e) => Err(ServiceError::Io(e)),
        }
    }

    fn kind(&self) -> &'static str {
        "local"
    }
}

/// S3 object store (AWS S3 and S3-compatible services via endpoint)
#[cfg(feature = "s3-storage")]
pub struct S3BlobStorage {
    client: aws_sdk_s3::Client,
    bucket: String,
}

#[cfg(feature = "s3-storage")]
impl S3BlobStorage {
    pub async fn new(config: &BlobStorageConfig) -> Result<Self, ServiceError> {
        use aws_config::meta::region::RegionProviderChain;
        use aws_config::Region;
        use aws_sdk_s3::config::Credentials;

        let region = if config.region.is_empty() {
            Region::new("us-east-1")
        } else {
            Region::new(config.region.clone())
        };
        let mut config_builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(RegionProviderChain::first_try(region));

        if let Some(endpoint_url) = &config.endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }

        // Fall back to the default credential chain when no static keys are set
        if !config.access_key.is_empty() && !config.secret_key.is_empty() {
            let credentials = Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                None,
                None,
                "agentry",
            );
            config_builder = config_builder.credentials_provider(credentials);
        }

        let sdk_config = config_builder.load().await;
        let client = aws_sdk_s3::Client::new(&sdk_config);

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
        })
    }
}

#[cfg(feature = "s3-storage")]
#[async_trait]
impl BlobStorage for S3BlobStorage {
    async fn put_if_absent(&self, key: &str, data: &[u8]) -> Result<PutOutcome, ServiceError> {
        use aws_sdk_s3::primitives::ByteStream;

        let result = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .if_none_match("*")
            .content_type("text/markdown; charset=utf-8")
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(PutOutcome::Created),
            Err(e) => {
                let status = e.raw_response().map(|r| r.status().as_u16());
                // 412: key exists; 409: a concurrent conditional write won
                if matches!(status, Some(412) | Some(409)) {
                    Ok(PutOutcome::AlreadyExists)
                } else {
                    Err(ServiceError::Storage(format!(
                        "Failed to upload to S3: {}",
                        map_s3_error(&e)
                    )))
                }
            }
        }
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ServiceError> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    ServiceError::NotFound(format!("Object not found: {}", key))
                } else {
                    ServiceError::Storage(format!(
                        "Failed to download from S3: {}",
                        map_s3_error(&service_error)
                    ))
                }
            })?;

        let data = result
            .body
            .collect()
            .await
            .map_err(|e| ServiceError::Storage(format!("Failed to read S3 response: {}", e)))?;
        Ok(data.into_bytes().to_vec())
    }

    fn kind(&self) -> &'static str {
        "s3"
    }
}

/// Map AWS SDK errors to short messages
#[cfg(feature = "s3-storage")]
fn map_s3_error(err: &dyn std::error::Error) -> String {
    let err_str = err.to_string();

    if err_str.contains("NoSuchBucket") {
        "Bucket not found".to_string()
    } else if err_str.contains("AccessDenied") || err_str.contains("access denied") {
        "Access denied".to_string()
    } else if err_str.contains("timeout") {
        "Request timeout".to_string()
    } else {
        format!("S3 error: {}", err_str)
    }
}

/// Create the configured object store
pub async fn create_blob_storage(
    config: &ServiceConfig,
) -> Result<Arc<dyn BlobStorage>, ServiceError> {
    let storage = &config.blob_storage;
    match storage.storage_type.as_str() {
        "local" => {
            let base_path = config.resolved_object_path();
            tokio::fs::create_dir_all(&base_path).await?;
            info!("Using local object store at {}", base_path.display());
            Ok(Arc::new(LocalBlobStorage::new(base_path)))
        }
        #[cfg(feature = "s3-storage")]
        "s3" => {
            if storage.bucket.is_empty() {
                return Err(ServiceError::Config(
                    "blob_storage.bucket is required for s3 storage".to_string(),
                ));
            }
            // access_key / secret_key are never logged
            info!(
                "Creating S3 object store: bucket='{}', region='{}', endpoint='{}'",
                storage.bucket,
                storage.region,
                storage.endpoint.as_deref().unwrap_or("<none>"),
            );
            Ok(Arc::new(S3BlobStorage::new(storage).await?))
        }
        #[cfg(not(feature = "s3-storage"))]
        "s3" => Err(ServiceError::Config(
            "S3 storage requires the 's3-storage' feature to be enabled".to_string(),
        )),
        other => Err(ServiceError::Config(format!(
            "Unsupported storage type: {}",
            other
        ))),
    }
}

/// Object store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobStorageConfig {
    /// `local` or `s3`
    pub storage_type: String,
    /// Root for local storage (defaults to `<data_dir>/objects`)
    pub base_path: Option<PathBuf>,
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    #[serde(skip_serializing)]
    pub access_key: String,
    #[serde(skip_serializing)]
    pub secret_key: String,
}

impl Default for BlobStorageConfig {
    fn default() -> Self {
        Self {
            storage_type: "local".to_string(),
            base_path: None,
            bucket: String::new(),
            region: String::new(),
            endpoint: None,
            access_key: String::new(),
            secret_key: String::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_if_absent_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let storage = LocalBlobStorage::new(dir.path().to_path_buf());

        let first = storage.put_if_absent("packages/a/b/1.0.0", b"one").await.unwrap();
        assert_eq!(first, PutOutcome::Created);

        let second = storage.put_if_absent("packages/a/b/1.0.0", b"two").await.unwrap();
        assert_eq!(second, PutOutcome::AlreadyExists);

        assert_eq!(storage.get("packages/a/b/1.0.0").await.unwrap(), b"one");
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let dir = TempDir::new().unwrap();
        let storage = LocalBlobStorage::new(dir.path().to_path_buf());

        let result = storage.get("packages/none").await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_traversal_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let storage = LocalBlobStorage::new(dir.path().join("objects"));

        for key in ["../escape", "a/../../b", "/etc/passwd", "", "a\\b", "./a"] {
            let result = storage.put_if_absent(key, b"x").await;
            assert!(
                matches!(result, Err(ServiceError::Storage(_))),
                "{key:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_concurrent_puts_create_once() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(LocalBlobStorage::new(dir.path().to_path_buf()));

        let mut handles = Vec::new();
        for i in 0..8u8 {
            let storage = storage.clone();
            handles.push(tokio::spawn(async move {
                storage.put_if_absent("race/key", &[i]).await.unwrap()
            }));
        }
        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap() == PutOutcome::Created {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn test_factory_rejects_unknown_backend() {
        let dir = TempDir::new().unwrap();
        let mut config = ServiceConfig::with_data_dir(dir.path());
        config.blob_storage.storage_type = "ftp".to_string();
        let result = create_blob_storage(&config).await;
        assert!(matches!(result, Err(ServiceError::Config(_))));
    }
}
