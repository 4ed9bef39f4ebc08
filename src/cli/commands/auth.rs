//! Account and authentication commands

use crate::cli::config::ClientContext;
use crate::cli::error::{CliError, CliResult};
use crate::cli::utils::api_client::ApiClient;
use crate::cli::utils::messages;
use agentry::core::tokens::is_token_format;
use clap::{Args, Subcommand};

/// Authentication command arguments
#[derive(Debug, Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Create an account and store its first token
    Register(RegisterArgs),
    /// Store an existing API token for the registry
    Login(LoginArgs),
    /// Remove the stored token for the registry
    Logout,
    /// Show the account behind the current token
    Whoami,
}

#[derive(Debug, Args)]
pub struct RegisterArgs {
    /// Email address for the account
    #[arg(long)]
    pub email: String,

    /// Username (2-39 characters)
    #[arg(long)]
    pub username: String,

    /// Print the token without saving it
    #[arg(long)]
    pub no_save: bool,
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// API token; prompted for when omitted
    #[arg(long)]
    pub token: Option<String>,
}

/// Execute authentication command
pub async fn execute_auth(context: &ClientContext, args: AuthArgs) -> CliResult<()> {
    match args.command {
        AuthCommand::Register(register_args) => execute_register(context, register_args).await,
        AuthCommand::Login(login_args) => execute_login(context, login_args).await,
        AuthCommand::Logout => execute_logout(context),
        AuthCommand::Whoami => execute_whoami(context).await,
    }
}

async fn execute_register(context: &ClientContext, args: RegisterArgs) -> CliResult<()> {
    let client = context.anonymous_client()?;
    let registration = client.register(&args.email, &args.username).await?;

    println!(
        "{}",
        messages::ok(&format!(
            "Registered {} on {}",
            registration.user.username, context.registry_url
        ))
    );
    println!("API token (shown once): {}", registration.token.raw_token);

    if args.no_save {
        println!(
            "{}",
            messages::warning("Token not saved; keep it somewhere safe")
        );
    } else {
        context.credentials.set(
            &context.registry_url,
            &registration.token.raw_token,
            Some(registration.user.username),
        )?;
        println!("Token saved to {}", context.credentials.path().display());
    }

    Ok(())
}

async fn execute_login(context: &ClientContext, args: LoginArgs) -> CliResult<()> {
    let raw = match args.token {
        Some(token) => token,
        None => inquire::Password::new("API token:")
            .without_confirmation()
            .with_display_mode(inquire::PasswordDisplayMode::Masked)
            .prompt()
            .map_err(|e| CliError::Validation(format!("Failed to read token: {}", e)))?,
    };
    let token = raw.trim().to_ascii_lowercase();
    if !is_token_format(&token) {
        return Err(CliError::Validation(
            "API tokens are 64 hexadecimal characters".to_string(),
        ));
    }

    // Confirm the token works before saving it
    let client = ApiClient::new(&context.registry_url, Some(token.clone()))?;
    let me = client.whoami().await?;

    context
        .credentials
        .set(&context.registry_url, &token, Some(me.user.username.clone()))?;

    println!(
        "{}",
        messages::ok(&format!(
            "Logged in to {} as {}",
            context.registry_url, me.user.username
        ))
    );
    Ok(())
}

fn execute_logout(context: &ClientContext) -> CliResult<()> {
    if context.credentials.remove(&context.registry_url)? {
        println!(
            "{}",
            messages::ok(&format!("Logged out from {}", context.registry_url))
        );
    } else {
        println!(
            "{}",
            messages::info(&format!("No stored token for {}", context.registry_url))
        );
    }
    Ok(())
}

async fn execute_whoami(context: &ClientContext) -> CliResult<()> {
    let me = context.authenticated_client()?.whoami().await?;

    println!("Registry:  {}", context.registry_url);
    println!("Username:  {}", me.user.username);
    println!("Email:     {}", me.user.email);
    if me.organizations.is_empty() {
        println!("Organizations: none");
    } else {
        println!("Organizations:");
        for membership in &me.organizations {
            println!("  {} ({})", membership.org, membership.role);
        }
    }
    Ok(())
}
