//! Axum middleware for bearer token authentication

use crate::core::service::ServiceError;
use crate::http::errors::HttpError;
use crate::http::handlers::AppState;
use axum::{
    extract::{Request, State},
    http::{header, Method},
    middleware::Next,
    response::Response,
};
use tracing::debug;
use uuid::Uuid;

/// Authenticated caller, attached to request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
}

/// Pull the raw token out of `Authorization: Bearer <token>`
pub fn extract_bearer(req: &Request) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

/// Check if a route is public (does not require authentication)
pub fn is_public_route(method: &Method, path: &str) -> bool {
    match (method, path) {
        (&Method::GET, "/health") => true,
        (&Method::GET, "/api/status") => true,

        // Registration hands out the first token
        (&Method::POST, "/api/users") => true,

        // Read-only registry endpoints
        (&Method::GET, path) if path.starts_with("/api/packages/") => true,
        (&Method::GET, path) if path.starts_with("/api/download/") => true,
        (&Method::GET, path) if path.starts_with("/api/orgs/") && path.ends_with("/packages") => {
            true
        }

        // All other routes require authentication
        _ => false,
    }
}

/// Reject protected requests without a valid token before any handler runs
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, HttpError> {
    if is_public_route(req.method(), req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let token = extract_bearer(&req)
        .map(str::to_string)
        .ok_or_else(|| HttpError::Unauthorized("No authentication token provided".to_string()))?;

    let user_id = match state.service.tokens().verify_token(&token).await {
        Ok(user_id) => user_id,
        Err(ServiceError::Unauthorized) => {
            debug!("Rejected bearer token for {}", req.uri().path());
            return Err(HttpError::Unauthorized(
                "Invalid or revoked token".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    req.extensions_mut().insert(AuthContext { user_id });
    Ok(next.run(req).await)
}
