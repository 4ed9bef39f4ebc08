//! Package publish and resolve handlers

use crate::core::models::VersionDescriptor;
use crate::http::auth::AuthContext;
use crate::http::errors::HttpResult;
use crate::http::handlers::AppState;
use crate::http::models::{ApiResponse, PublishBody, PublishResponse};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::info;

/// POST /api/packages - Publish a new version
pub async fn publish(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<PublishBody>, JsonRejection>,
) -> HttpResult<(StatusCode, Json<ApiResponse<PublishResponse>>)> {
    let Json(body) = payload?;

    info!(
        "Publish request for {}/{}@{} by {}",
        body.org, body.package, body.version, auth.user_id
    );
    let outcome = state.service.publish(auth.user_id, body.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(PublishResponse {
            version: outcome.record,
            descriptor: outcome.descriptor,
        })),
    ))
}

/// GET /api/packages/:org/:package - Latest version
pub async fn resolve_latest(
    State(state): State<AppState>,
    Path((org, package)): Path<(String, String)>,
) -> HttpResult<Json<ApiResponse<VersionDescriptor>>> {
    let descriptor = state.service.resolver().resolve_latest(&org, &package).await?;
    Ok(Json(ApiResponse::success(descriptor)))
}

/// GET /api/packages/:org/:package/versions - Newest first
pub async fn list_versions(
    State(state): State<AppState>,
    Path((org, package)): Path<(String, String)>,
) -> HttpResult<Json<ApiResponse<Vec<VersionDescriptor>>>> {
    let versions = state.service.resolver().list_versions(&org, &package).await?;
    Ok(Json(ApiResponse::success(versions)))
}

/// GET /api/packages/:org/:package/versions/:version
pub async fn resolve_exact(
    State(state): State<AppState>,
    Path((org, package, version)): Path<(String, String, String)>,
) -> HttpResult<Json<ApiResponse<VersionDescriptor>>> {
    let descriptor = state
        .service
        .resolver()
        .resolve_exact(&org, &package, &version)
        .await?;
    Ok(Json(ApiResponse::success(descriptor)))
}
