//! Install command implementation
//!
//! Resolves a package version, downloads it through the descriptor's ticket
//! URL and recomputes the SHA-256 locally. Content lands in a temporary file
//! beside the target and is persisted only once the checksum matches, so a
//! failed install never leaves a partial or unverified file behind.

use crate::cli::config::ClientContext;
use crate::cli::error::{CliError, CliResult};
use crate::cli::utils::api_client::ApiClient;
use crate::cli::utils::{messages, PackageRef};
use agentry::core::checksum;
use agentry::VersionDescriptor;
use clap::Args;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Install a package version into a local directory
#[derive(Debug, Args)]
pub struct InstallArgs {
    /// Package as org/package or org/package@version
    pub reference: String,

    /// Exact version to install (latest when omitted)
    #[arg(long)]
    pub version: Option<String>,

    /// Directory to install into; files land in <dir>/<org>/<package>.md
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,
}

/// Result of a successful install
#[derive(Debug)]
pub struct InstalledPackage {
    pub path: PathBuf,
    pub descriptor: VersionDescriptor,
}

pub fn target_path(dir: &Path, org: &str, package: &str) -> PathBuf {
    dir.join(org).join(format!("{}.md", package))
}

/// The descriptor must describe exactly what was asked for
fn check_descriptor(reference: &PackageRef, descriptor: &VersionDescriptor) -> CliResult<()> {
    let version_matches = reference
        .version
        .as_ref()
        .map_or(true, |pinned| pinned == &descriptor.version);

    if descriptor.org != reference.org || descriptor.package != reference.package || !version_matches
    {
        return Err(CliError::UnexpectedPackage {
            requested: reference.to_string(),
            actual: format!(
                "{}/{}@{}",
                descriptor.org, descriptor.package, descriptor.version
            ),
        });
    }
    Ok(())
}

/// Resolve, download, verify and persist
pub async fn install_package(
    client: &ApiClient,
    reference: &PackageRef,
    dir: &Path,
) -> CliResult<InstalledPackage> {
    let descriptor = client
        .resolve(
            &reference.org,
            &reference.package,
            reference.version.as_deref(),
        )
        .await?;
    debug!(
        "Resolved {}/{} to {} ({})",
        descriptor.org, descriptor.package, descriptor.version, descriptor.checksum
    );
    check_descriptor(reference, &descriptor)?;

    let download = client.download(&descriptor.download_url).await?;
    if let Some(header) = &download.checksum_header {
        if !header.eq_ignore_ascii_case(&descriptor.checksum) {
            warn!(
                "Checksum header {} differs from descriptor {}",
                header, descriptor.checksum
            );
        }
    }

    // The path comes from the validated reference, never from the registry
    let target = target_path(dir, &reference.org, &reference.package);
    let parent = target
        .parent()
        .ok_or_else(|| CliError::Config(format!("Invalid target path {}", target.display())))?;
    std::fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(&download.content)?;
    temp.as_file().sync_all()?;

    if !checksum::verify(&download.content, &descriptor.checksum) {
        // Dropping `temp` deletes the unverified bytes
        return Err(CliError::Integrity {
            expected: descriptor.checksum,
            actual: checksum::checksum(&download.content),
        });
    }

    temp.persist(&target).map_err(|e| CliError::Io(e.error))?;

    Ok(InstalledPackage {
        path: target,
        descriptor,
    })
}

pub async fn execute_install(context: &ClientContext, args: InstallArgs) -> CliResult<()> {
    let mut reference = PackageRef::parse(&args.reference)?;
    if let Some(version) = args.version {
        if reference.version.as_ref().is_some_and(|v| v != &version) {
            return Err(CliError::Validation(format!(
                "Conflicting versions: '{}' and --version {}",
                args.reference, version
            )));
        }
        reference = PackageRef::parse(&format!(
            "{}/{}@{}",
            reference.org, reference.package, version
        ))?;
    }

    println!("Installing {} from {}", reference, context.registry_url);
    let client = context.anonymous_client()?;
    let installed = install_package(&client, &reference, &args.dir).await?;

    println!(
        "{}",
        messages::ok(&format!(
            "Installed {}/{}@{} to {}",
            installed.descriptor.org,
            installed.descriptor.package,
            installed.descriptor.version,
            installed.path.display()
        ))
    );
    println!("  sha256: {} (verified)", installed.descriptor.checksum);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    async fn mount_registry(server: &MockServer, version_path: &str, body: &'static [u8]) {
        mount_descriptor(server, version_path, body, "acme", "demo-agent", "1.0.0").await;
    }

    async fn mount_descriptor(
        server: &MockServer,
        version_path: &str,
        body: &'static [u8],
        org: &str,
        package: &str,
        version: &str,
    ) {
        let descriptor = json!({
            "success": true,
            "data": {
                "org": org,
                "package": package,
                "version": version,
                "checksum": HELLO_SHA256,
                "sizeBytes": 5,
                "publishedAt": "2026-01-01T00:00:00Z",
                "publishedBy": "7f1c2f4e-3b7a-4a55-9a51-0f6d2c1e9b10",
                "downloadUrl": format!("{}/api/download/ticket-1", server.uri()),
                "expiresAt": "2026-01-01T00:15:00Z"
            },
            "error": null
        });

        Mock::given(method("GET"))
            .and(path(version_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(descriptor))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/download/ticket-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-checksum-sha256", HELLO_SHA256)
                    .set_body_bytes(body),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_install_verified_content() {
        let server = MockServer::start().await;
        mount_registry(&server, "/api/packages/acme/demo-agent", b"hello").await;

        let dir = TempDir::new().unwrap();
        let client = ApiClient::new(&server.uri(), None).unwrap();
        let reference = PackageRef::parse("acme/demo-agent").unwrap();

        let installed = install_package(&client, &reference, dir.path())
            .await
            .unwrap();

        assert_eq!(installed.path, dir.path().join("acme").join("demo-agent.md"));
        assert_eq!(std::fs::read(&installed.path).unwrap(), b"hello");
        assert_eq!(installed.descriptor.checksum, HELLO_SHA256);
    }

    #[tokio::test]
    async fn test_install_exact_version_uses_versions_route() {
        let server = MockServer::start().await;
        mount_registry(&server, "/api/packages/acme/demo-agent/versions/1.0.0", b"hello").await;

        let dir = TempDir::new().unwrap();
        let client = ApiClient::new(&server.uri(), None).unwrap();
        let reference = PackageRef::parse("acme/demo-agent@1.0.0").unwrap();

        let installed = install_package(&client, &reference, dir.path())
            .await
            .unwrap();
        assert_eq!(installed.descriptor.version, "1.0.0");
    }

    #[tokio::test]
    async fn test_tampered_download_leaves_nothing_behind() {
        let server = MockServer::start().await;
        mount_registry(&server, "/api/packages/acme/demo-agent", b"hellO").await;

        let dir = TempDir::new().unwrap();
        let client = ApiClient::new(&server.uri(), None).unwrap();
        let reference = PackageRef::parse("acme/demo-agent").unwrap();

        let err = install_package(&client, &reference, dir.path())
            .await
            .unwrap_err();

        match &err {
            CliError::Integrity { expected, actual } => {
                assert_eq!(expected, HELLO_SHA256);
                assert_ne!(actual, HELLO_SHA256);
            }
            other => panic!("expected integrity error, got {}", other),
        }
        assert_eq!(err.exit_code(), 3);

        assert!(!target_path(dir.path(), "acme", "demo-agent").exists());
        let leftovers = std::fs::read_dir(dir.path().join("acme")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_tampered_download_keeps_previous_install() {
        let server = MockServer::start().await;
        mount_registry(&server, "/api/packages/acme/demo-agent", b"tampered").await;

        let dir = TempDir::new().unwrap();
        let target = target_path(dir.path(), "acme", "demo-agent");
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(&target, b"previous").unwrap();

        let client = ApiClient::new(&server.uri(), None).unwrap();
        let reference = PackageRef::parse("acme/demo-agent").unwrap();
        assert!(install_package(&client, &reference, dir.path())
            .await
            .is_err());

        assert_eq!(std::fs::read(&target).unwrap(), b"previous");
    }

    #[tokio::test]
    async fn test_descriptor_cannot_redirect_the_install_path() {
        let server = MockServer::start().await;
        mount_descriptor(
            &server,
            "/api/packages/acme/demo-agent",
            b"hello",
            "../../escaped",
            "demo-agent",
            "1.0.0",
        )
        .await;

        let root = TempDir::new().unwrap();
        let dir = root.path().join("a").join("b");
        let client = ApiClient::new(&server.uri(), None).unwrap();
        let reference = PackageRef::parse("acme/demo-agent").unwrap();

        let err = install_package(&client, &reference, &dir).await.unwrap_err();
        assert!(matches!(err, CliError::UnexpectedPackage { .. }), "{}", err);
        assert!(!root.path().join("escaped").exists());
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_pinned_version_must_match_descriptor() {
        let server = MockServer::start().await;
        mount_descriptor(
            &server,
            "/api/packages/acme/demo-agent/versions/1.0.0",
            b"hello",
            "acme",
            "demo-agent",
            "2.0.0",
        )
        .await;

        let dir = TempDir::new().unwrap();
        let client = ApiClient::new(&server.uri(), None).unwrap();
        let reference = PackageRef::parse("acme/demo-agent@1.0.0").unwrap();

        assert!(matches!(
            install_package(&client, &reference, dir.path()).await,
            Err(CliError::UnexpectedPackage { .. })
        ));
        assert!(!target_path(dir.path(), "acme", "demo-agent").exists());
    }

    #[tokio::test]
    async fn test_other_package_in_descriptor_is_rejected() {
        let server = MockServer::start().await;
        mount_descriptor(
            &server,
            "/api/packages/acme/demo-agent",
            b"hello",
            "acme",
            "other-agent",
            "1.0.0",
        )
        .await;

        let dir = TempDir::new().unwrap();
        let client = ApiClient::new(&server.uri(), None).unwrap();
        let reference = PackageRef::parse("acme/demo-agent").unwrap();

        assert!(install_package(&client, &reference, dir.path()).await.is_err());
        assert!(!dir.path().join("acme").exists());
    }

    #[tokio::test]
    async fn test_missing_package_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/packages/acme/ghost"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "success": false,
                "data": null,
                "error": {"code": "NOT_FOUND", "message": "Package acme/ghost not found", "details": null}
            })))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let client = ApiClient::new(&server.uri(), None).unwrap();
        let reference = PackageRef::parse("acme/ghost").unwrap();

        assert!(matches!(
            install_package(&client, &reference, dir.path()).await,
            Err(CliError::Api { status: 404, .. })
        ));
        assert!(!dir.path().join("acme").exists());
    }
}
