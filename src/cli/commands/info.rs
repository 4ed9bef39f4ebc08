//! Info command implementation

use crate::cli::config::ClientContext;
use crate::cli::error::{CliError, CliResult};
use crate::cli::utils::{messages, PackageRef};
use clap::Args;

/// Show the published versions of a package
#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Package as org/package
    pub reference: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute_info(context: &ClientContext, args: InfoArgs) -> CliResult<()> {
    let reference = PackageRef::parse(&args.reference)?;
    let versions = context
        .anonymous_client()?
        .list_versions(&reference.org, &reference.package)
        .await?;

    if args.json {
        let rendered = serde_json::to_string_pretty(&versions)
            .map_err(|e| CliError::Validation(format!("Failed to render JSON: {}", e)))?;
        println!("{}", rendered);
        return Ok(());
    }

    println!("{}/{}", reference.org, reference.package);
    if versions.is_empty() {
        println!("{}", messages::info("No published versions"));
        return Ok(());
    }

    println!(
        "  {:<12} {:<14} {:>10}  PUBLISHED",
        "VERSION", "SHA256", "SIZE"
    );
    for version in &versions {
        println!(
            "  {:<12} {:<14} {:>10}  {}",
            version.version,
            messages::short_checksum(&version.checksum),
            messages::format_size(version.size_bytes),
            version.published_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    Ok(())
}
