//! API token commands

use crate::cli::config::ClientContext;
use crate::cli::error::{CliError, CliResult};
use crate::cli::utils::messages;
use clap::{Args, Subcommand};
use uuid::Uuid;

#[derive(Debug, Args)]
pub struct TokenArgs {
    #[command(subcommand)]
    pub command: TokenCommand,
}

#[derive(Debug, Subcommand)]
pub enum TokenCommand {
    /// Issue a new token; it is printed once
    Create {
        #[arg(long)]
        label: Option<String>,
    },
    /// List your tokens
    List,
    /// Revoke a token by id
    Revoke { id: String },
}

pub async fn execute_token(context: &ClientContext, args: TokenArgs) -> CliResult<()> {
    let client = context.authenticated_client()?;

    match args.command {
        TokenCommand::Create { label } => {
            let issued = client.create_token(label).await?;
            println!("{}", messages::ok(&format!("Created token {}", issued.token.id)));
            println!("API token (shown once): {}", issued.raw_token);
        }
        TokenCommand::List => {
            let tokens = client.list_tokens().await?;
            println!("{:<38} {:<20} {:<22} LAST USED", "ID", "LABEL", "CREATED");
            for token in tokens {
                println!(
                    "{:<38} {:<20} {:<22} {}",
                    token.id,
                    token.label.as_deref().unwrap_or("-"),
                    token.created_at.format("%Y-%m-%d %H:%M:%S"),
                    token
                        .last_used_at
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_else(|| "never".to_string())
                );
            }
        }
        TokenCommand::Revoke { id } => {
            let id = Uuid::parse_str(id.trim())
                .map_err(|_| CliError::Validation(format!("Invalid token id '{}'", id)))?;
            client.revoke_token(&id.to_string()).await?;
            println!("{}", messages::ok(&format!("Revoked token {}", id)));
        }
    }
    Ok(())
}
