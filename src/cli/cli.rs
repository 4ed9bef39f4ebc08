//! Main CLI application structure

use clap::Parser;

use crate::cli::auth_config::CredentialStore;
use crate::cli::commands::{auth, info, install, org, publish, serve, token, version, Commands};
use crate::cli::config::ClientContext;
use crate::cli::error::CliResult;

/// agentry CLI - publish and install agent packages
#[derive(Debug, Parser)]
#[command(name = "agentry")]
#[command(version = agentry::VERSION)]
#[command(about = "agentry CLI - publish and install agent packages")]
#[command(long_about = "agentry publishes agent and skill definitions to a registry \
                         and installs them with SHA-256 verification.\n\n\
                         The registry is taken from --registry, then AGENTRY_REGISTRY, \
                         then http://localhost:8080. Tokens come from AGENTRY_TOKEN or \
                         the credentials saved by `agentry auth login`.\n\n\
                         Examples:\n\
                           agentry auth register --email dev@example.com --username dev\n\
                           agentry org create acme\n\
                           agentry publish ./demo-agent.md acme/demo-agent@1.0.0\n\
                           agentry install acme/demo-agent --dir ./agents")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Registry base URL
    #[arg(long, global = true, env = "AGENTRY_REGISTRY")]
    pub registry: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> CliResult<()> {
        if self.verbose && std::env::var("RUST_LOG").is_err() {
            std::env::set_var("RUST_LOG", "agentry=debug");
        }
        agentry::init_logging();

        // Commands that never talk to a registry
        let command = match self.command {
            Commands::Version(args) => return version::execute_version(args).await,
            Commands::Serve(args) => return serve::execute_serve(args).await,
            command => command,
        };

        let context = ClientContext::new(
            self.registry.as_deref(),
            CredentialStore::default_location()?,
        )?;

        match command {
            Commands::Auth(args) => auth::execute_auth(&context, args).await,
            Commands::Org(args) => org::execute_org(&context, args).await,
            Commands::Token(args) => token::execute_token(&context, args).await,
            Commands::Publish(args) => publish::execute_publish(&context, args).await,
            Commands::Install(args) => install::execute_install(&context, args).await,
            Commands::Info(args) => info::execute_info(&context, args).await,
            Commands::Version(_) | Commands::Serve(_) => unreachable!("Handled above"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_publish() {
        let cli = Cli::try_parse_from([
            "agentry",
            "--registry",
            "https://registry.example.com",
            "publish",
            "agent.md",
            "acme/demo-agent@1.0.0",
        ])
        .unwrap();

        assert_eq!(cli.registry.as_deref(), Some("https://registry.example.com"));
        match cli.command {
            Commands::Publish(args) => {
                assert_eq!(args.reference, "acme/demo-agent@1.0.0");
                assert_eq!(args.file, std::path::PathBuf::from("agent.md"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_install_defaults() {
        let cli = Cli::try_parse_from(["agentry", "install", "acme/demo-agent", "-v"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Install(args) => {
                assert_eq!(args.dir, std::path::PathBuf::from("."));
                assert_eq!(args.version, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_missing_subcommand_is_an_error() {
        assert!(Cli::try_parse_from(["agentry"]).is_err());
    }
}
