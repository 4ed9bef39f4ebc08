//! Command modules for CLI

pub mod auth;
pub mod info;
pub mod install;
pub mod org;
pub mod publish;
pub mod serve;
pub mod token;
pub mod version;

use clap::Subcommand;

#[derive(Debug, Subcommand)]
#[command(about = "agentry CLI commands")]
pub enum Commands {
    /// Account registration and token storage (register, login, logout, whoami)
    #[command(about = "Manage authentication for registries")]
    Auth(auth::AuthArgs),

    /// Organizations and membership
    #[command(about = "Create organizations and manage members")]
    Org(org::OrgArgs),

    /// API tokens for the current account
    #[command(about = "Create, list and revoke API tokens")]
    Token(token::TokenArgs),

    /// Publish a local file as an immutable package version
    #[command(about = "Publish a package version")]
    Publish(publish::PublishArgs),

    /// Download, verify and install a package version
    #[command(about = "Install a package with checksum verification")]
    Install(install::InstallArgs),

    /// List the published versions of a package
    #[command(about = "Show package versions")]
    Info(info::InfoArgs),

    /// Run the registry server
    #[command(about = "Serve the registry HTTP API")]
    Serve(serve::ServeArgs),

    /// Show version information
    #[command(about = "Show version information")]
    Version(version::VersionArgs),
}
