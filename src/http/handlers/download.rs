//! Ticketed content download

use crate::http::errors::{HttpError, HttpResult};
use crate::http::handlers::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::Response,
};

/// Header carrying the authoritative SHA-256 of the body
pub const CHECKSUM_HEADER: &str = "x-checksum-sha256";

/// GET /api/download/:ticket
pub async fn download(
    State(state): State<AppState>,
    Path(ticket): Path<String>,
) -> HttpResult<Response> {
    let (claims, content) = state.service.resolver().fetch_by_ticket(&ticket).await?;

    let disposition = format!("attachment; filename=\"{}-{}.md\"", claims.pkg, claims.ver);
    let checksum = HeaderValue::from_str(&claims.sha)
        .map_err(|e| HttpError::InternalServerError(format!("Invalid checksum header: {}", e)))?;
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| HttpError::InternalServerError(format!("Invalid disposition: {}", e)))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/markdown; charset=utf-8")
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CACHE_CONTROL, "private, max-age=0, no-store")
        .header(CHECKSUM_HEADER, checksum)
        .body(Body::from(content))
        .map_err(|e| HttpError::InternalServerError(format!("Failed to build response: {}", e)))
}
