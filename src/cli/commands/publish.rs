//! Publish command implementation

use crate::cli::config::ClientContext;
use crate::cli::error::{CliError, CliResult};
use crate::cli::utils::api_client::ApiClient;
use crate::cli::utils::{messages, PackageRef};
use agentry::core::{checksum, naming};
use agentry::http::models::{PublishBody, PublishResponse};
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Publish a local file as a new package version
#[derive(Debug, Args)]
pub struct PublishArgs {
    /// File to publish (UTF-8 text, usually markdown)
    pub file: PathBuf,

    /// Target as org/package@version
    pub reference: String,

    /// Package description shown in listings
    #[arg(long)]
    pub description: Option<String>,
}

/// Pre-flight checks and request body for a publish
pub fn prepare_publish(
    file: &Path,
    reference: &PackageRef,
    description: Option<String>,
) -> CliResult<PublishBody> {
    let version = reference.require_version()?;

    if !naming::is_recommended_package_name(&reference.package) {
        println!(
            "{}",
            messages::warning(&format!(
                "Package name '{}' is shorter than {} characters; the registry may reject it",
                reference.package,
                naming::RECOMMENDED_MIN_PACKAGE_LEN
            ))
        );
    }

    let bytes = std::fs::read(file).map_err(|e| {
        CliError::Validation(format!("Failed to read {}: {}", file.display(), e))
    })?;
    if bytes.is_empty() {
        return Err(CliError::Validation(format!("{} is empty", file.display())));
    }
    let content = String::from_utf8(bytes)
        .map_err(|_| CliError::Validation(format!("{} is not valid UTF-8", file.display())))?;

    let local_checksum = checksum::checksum(content.as_bytes());
    debug!("Local checksum for {}: {}", file.display(), local_checksum);

    Ok(PublishBody {
        org: reference.org.clone(),
        package: reference.package.clone(),
        version: version.to_string(),
        content,
        description,
        expected_checksum: Some(local_checksum),
    })
}

/// Send the body and confirm the registry stored what was sent
pub async fn publish_body(client: &ApiClient, body: &PublishBody) -> CliResult<PublishResponse> {
    let response = client.publish(body).await?;

    if let Some(expected) = &body.expected_checksum {
        if &response.version.checksum != expected {
            return Err(CliError::Integrity {
                expected: expected.clone(),
                actual: response.version.checksum,
            });
        }
    }
    Ok(response)
}

pub async fn execute_publish(context: &ClientContext, args: PublishArgs) -> CliResult<()> {
    let reference = PackageRef::parse(&args.reference)?;
    let body = prepare_publish(&args.file, &reference, args.description)?;

    println!("Publishing {} to {}", reference, context.registry_url);
    if let Some(local) = &body.expected_checksum {
        println!("  sha256: {}", local);
    }

    let client = context.authenticated_client()?;
    let response = publish_body(&client, &body).await?;

    println!(
        "{}",
        messages::ok(&format!(
            "Published {}/{}@{} ({})",
            response.version.org,
            response.version.package,
            response.version.version,
            messages::format_size(response.version.size_bytes)
        ))
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    fn publish_response(checksum: &str) -> serde_json::Value {
        json!({
            "success": true,
            "data": {
                "version": {
                    "id": "0b9f6c3e-2f4b-4f1e-8d4a-0c3a8e2b7d11",
                    "packageId": "5a4e7c2b-1d3f-4b6a-9e8d-7c6b5a4f3e21",
                    "org": "acme",
                    "package": "demo-agent",
                    "version": "1.0.0",
                    "checksum": checksum,
                    "sizeBytes": 5,
                    "storageKey": "packages/x/demo-agent/1.0.0/abc",
                    "publishedBy": "7f1c2f4e-3b7a-4a55-9a51-0f6d2c1e9b10",
                    "createdAt": "2026-01-01T00:00:00Z"
                },
                "descriptor": {
                    "org": "acme",
                    "package": "demo-agent",
                    "version": "1.0.0",
                    "checksum": checksum,
                    "sizeBytes": 5,
                    "publishedAt": "2026-01-01T00:00:00Z",
                    "publishedBy": "7f1c2f4e-3b7a-4a55-9a51-0f6d2c1e9b10",
                    "downloadUrl": "http://localhost/api/download/t",
                    "expiresAt": "2026-01-01T00:15:00Z"
                }
            },
            "error": null
        })
    }

    fn write_file(dir: &TempDir, content: &[u8]) -> PathBuf {
        let file = dir.path().join("agent.md");
        std::fs::write(&file, content).unwrap();
        file
    }

    #[test]
    fn test_prepare_computes_local_checksum() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, b"hello");
        let reference = PackageRef::parse("acme/demo-agent@1.0.0").unwrap();

        let body = prepare_publish(&file, &reference, None).unwrap();
        assert_eq!(body.expected_checksum.as_deref(), Some(HELLO_SHA256));
        assert_eq!(body.content, "hello");
    }

    #[test]
    fn test_prepare_rejects_bad_input() {
        let dir = TempDir::new().unwrap();
        let reference = PackageRef::parse("acme/demo-agent@1.0.0").unwrap();

        let empty = write_file(&dir, b"");
        assert!(matches!(
            prepare_publish(&empty, &reference, None),
            Err(CliError::Validation(_))
        ));

        let binary = write_file(&dir, &[0xff, 0xfe, 0x00]);
        assert!(matches!(
            prepare_publish(&binary, &reference, None),
            Err(CliError::Validation(_))
        ));

        let unversioned = PackageRef::parse("acme/demo-agent").unwrap();
        let file = write_file(&dir, b"hello");
        assert!(prepare_publish(&file, &unversioned, None).is_err());
    }

    #[tokio::test]
    async fn test_publish_sends_token_and_checksum() {
        let server = MockServer::start().await;
        let token = "ab".repeat(32);
        let expected = json!({
            "org": "acme",
            "package": "demo-agent",
            "version": "1.0.0",
            "content": "hello",
            "expectedChecksum": HELLO_SHA256
        });
        Mock::given(method("POST"))
            .and(path("/api/packages"))
            .and(header("authorization", format!("Bearer {}", token).as_str()))
            .and(move |request: &Request| {
                serde_json::from_slice::<serde_json::Value>(&request.body)
                    .map(|body| body == expected)
                    .unwrap_or(false)
            })
            .respond_with(ResponseTemplate::new(201).set_body_json(publish_response(HELLO_SHA256)))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, b"hello");
        let reference = PackageRef::parse("acme/demo-agent@1.0.0").unwrap();
        let body = prepare_publish(&file, &reference, None).unwrap();

        let client = ApiClient::new(&server.uri(), Some(token)).unwrap();
        let response = publish_body(&client, &body).await.unwrap();
        assert_eq!(response.version.checksum, HELLO_SHA256);
    }

    #[tokio::test]
    async fn test_checksum_disagreement_is_integrity_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/packages"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(publish_response(&"0".repeat(64))),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, b"hello");
        let reference = PackageRef::parse("acme/demo-agent@1.0.0").unwrap();
        let body = prepare_publish(&file, &reference, None).unwrap();

        let client = ApiClient::new(&server.uri(), Some("ab".repeat(32))).unwrap();
        let err = publish_body(&client, &body).await.unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[tokio::test]
    async fn test_conflict_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/packages"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "success": false,
                "data": null,
                "error": {"code": "CONFLICT", "message": "Version 1.0.0 of acme/demo-agent already exists", "details": null}
            })))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, b"hello");
        let reference = PackageRef::parse("acme/demo-agent@1.0.0").unwrap();
        let body = prepare_publish(&file, &reference, None).unwrap();

        let client = ApiClient::new(&server.uri(), Some("ab".repeat(32))).unwrap();
        assert!(matches!(
            publish_body(&client, &body).await,
            Err(CliError::Api { status: 409, .. })
        ));
    }
}
