//! Serve command implementation

use crate::cli::error::CliResult;
use agentry::{RegistryServer, RegistryService, ServerConfig};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Run the registry HTTP server
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Configuration file (defaults to ./agentry.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Host to bind the server to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind the server to
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory for the database and local object store
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

/// File and environment first, then command-line overrides
pub fn resolve_server_config(args: &ServeArgs) -> CliResult<ServerConfig> {
    let mut config = ServerConfig::load(args.config.as_deref())?;
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(data_dir) = &args.data_dir {
        config.registry.data_dir = data_dir.clone();
    }
    Ok(config)
}

pub async fn execute_serve(args: ServeArgs) -> CliResult<()> {
    let config = resolve_server_config(&args)?;

    info!(
        "Starting agentry registry on {}:{} (data in {})",
        config.host,
        config.port,
        config.registry.data_dir.display()
    );

    let service = Arc::new(RegistryService::new(config.registry.clone()).await?);
    let server = RegistryServer::new(service, &config.host, config.port)?
        .with_cors_origins(config.cors_origins.clone());

    println!("agentry registry starting...");
    println!("  Listening on: http://{}", server.addr());
    println!("  Storage: {}", config.registry.blob_storage.storage_type);

    server.serve().await?;
    Ok(())
}
