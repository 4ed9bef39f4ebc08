//! Organization commands

use crate::cli::config::ClientContext;
use crate::cli::error::{CliError, CliResult};
use crate::cli::utils::messages;
use agentry::core::naming;
use agentry::OrgRole;
use clap::{Args, Subcommand};

#[derive(Debug, Args)]
pub struct OrgArgs {
    #[command(subcommand)]
    pub command: OrgCommand,
}

#[derive(Debug, Subcommand)]
pub enum OrgCommand {
    /// Create an organization; you become its owner
    Create {
        /// Organization name (lowercase letters, digits, hyphens)
        name: String,
    },
    /// Add a user to an organization (owners only)
    AddMember {
        org: String,
        username: String,
        /// OWNER or MEMBER
        #[arg(long, default_value = "MEMBER")]
        role: String,
    },
    /// List an organization's packages
    Packages { org: String },
}

pub async fn execute_org(context: &ClientContext, args: OrgArgs) -> CliResult<()> {
    match args.command {
        OrgCommand::Create { name } => {
            naming::validate_org_name(&name)?;
            let org = context.authenticated_client()?.create_org(&name).await?;
            println!(
                "{}",
                messages::ok(&format!("Created organization '{}'", org.name))
            );
            Ok(())
        }
        OrgCommand::AddMember {
            org,
            username,
            role,
        } => {
            naming::validate_org_name(&org)?;
            let role: OrgRole = role.parse()?;
            context
                .authenticated_client()?
                .add_member(&org, &username, Some(role.to_string()))
                .await?;
            println!(
                "{}",
                messages::ok(&format!("Added {} to {} as {}", username, org, role))
            );
            Ok(())
        }
        OrgCommand::Packages { org } => {
            naming::validate_org_name(&org)?;
            let packages = context.anonymous_client()?.list_packages(&org).await?;
            if packages.is_empty() {
                println!("{}", messages::info(&format!("No packages in '{}'", org)));
                return Ok(());
            }

            println!("{:<32} {:<12} {:>8}  DESCRIPTION", "PACKAGE", "LATEST", "VERSIONS");
            for package in packages {
                println!(
                    "{:<32} {:<12} {:>8}  {}",
                    format!("{}/{}", package.org, package.name),
                    package.latest_version.as_deref().unwrap_or("-"),
                    package.version_count,
                    package.description.as_deref().unwrap_or("")
                );
            }
            Ok(())
        }
    }
}
