//! Axum HTTP server implementation

use crate::core::service::{RegistryService, ServiceError};
use crate::http::handlers::{download, orgs, packages, status, tokens, users, AppState};
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::{info, warn};

/// JSON escaping can inflate content; leave room for it and the envelope
fn body_limit(max_content_bytes: usize) -> usize {
    max_content_bytes.saturating_mul(2).saturating_add(64 * 1024)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

/// Build the application router
pub fn build_router(service: Arc<RegistryService>, cors_origins: &[String]) -> Router {
    let max_body = body_limit(service.config().max_content_bytes);
    let state = AppState::new(service);

    Router::new()
        .route("/health", get(status::health))
        .route("/api/status", get(status::status))
        // Accounts
        .route("/api/users", post(users::register))
        .route("/api/me", get(users::me))
        .route(
            "/api/tokens",
            get(tokens::list_tokens).post(tokens::create_token),
        )
        .route("/api/tokens/:id", delete(tokens::revoke_token))
        // Organizations
        .route("/api/orgs", post(orgs::create_org))
        .route("/api/orgs/:org/members", post(orgs::add_member))
        .route("/api/orgs/:org/packages", get(orgs::list_packages))
        // Packages
        .route("/api/packages", post(packages::publish))
        .route("/api/packages/:org/:package", get(packages::resolve_latest))
        .route(
            "/api/packages/:org/:package/versions",
            get(packages::list_versions),
        )
        .route(
            "/api/packages/:org/:package/versions/:version",
            get(packages::resolve_exact),
        )
        .route("/api/download/:ticket", get(download::download))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::http::auth::middleware::auth_middleware,
        ))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors_layer(cors_origins)),
        )
        .with_state(state)
}

/// Registry HTTP server
pub struct RegistryServer {
    service: Arc<RegistryService>,
    addr: SocketAddr,
    cors_origins: Vec<String>,
}

impl RegistryServer {
    /// Create a new server instance
    pub fn new(service: Arc<RegistryService>, host: &str, port: u16) -> Result<Self, ServiceError> {
        let addr = Self::parse_address(host, port).map_err(ServiceError::Config)?;
        Ok(Self {
            service,
            addr,
            cors_origins: Vec::new(),
        })
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    /// Parse and normalize host:port into a SocketAddr
    fn parse_address(host: &str, port: u16) -> Result<SocketAddr, String> {
        let normalized_host = Self::normalize_host(host);

        // IPv6 addresses need brackets
        let addr_str = if normalized_host.contains(':') {
            format!("[{}]:{}", normalized_host, port)
        } else {
            format!("{}:{}", normalized_host, port)
        };

        addr_str.parse().map_err(|_| {
            format!(
                "Unable to parse address '{}'. Use IP addresses like '127.0.0.1', '0.0.0.0' or '::1'",
                addr_str
            )
        })
    }

    /// Normalize hostnames for SocketAddr compatibility
    fn normalize_host(host: &str) -> String {
        match host {
            "localhost" => "127.0.0.1".to_string(),
            "::1" | "[::1]" => "::1".to_string(),
            "::" | "[::]" => "::".to_string(),
            _ => host.to_string(),
        }
    }

    /// Bind and serve until Ctrl-C
    pub async fn serve(self) -> Result<(), ServiceError> {
        let app = build_router(self.service.clone(), &self.cors_origins);

        info!("Starting agentry registry on {}", self.addr);
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        info!("Server bound to {}", listener.local_addr()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped");
        Ok(())
    }

    /// Get server address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
