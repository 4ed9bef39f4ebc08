//! Organization handlers

use crate::core::models::{OrgRole, Organization, PackageSummary};
use crate::http::auth::AuthContext;
use crate::http::errors::HttpResult;
use crate::http::handlers::AppState;
use crate::http::models::{AddMemberRequest, ApiResponse, CreateOrgRequest};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use validator::Validate;

/// POST /api/orgs - The caller becomes the owner
pub async fn create_org(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<CreateOrgRequest>, JsonRejection>,
) -> HttpResult<(StatusCode, Json<ApiResponse<Organization>>)> {
    let Json(request) = payload?;
    request.validate()?;

    let org = state
        .service
        .accounts()
        .create_organization(auth.user_id, &request.name)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(org))))
}

/// POST /api/orgs/:org/members
pub async fn add_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org): Path<String>,
    payload: Result<Json<AddMemberRequest>, JsonRejection>,
) -> HttpResult<StatusCode> {
    let Json(request) = payload?;
    request.validate()?;

    let role = match request.role.as_deref() {
        Some(role) => role.parse::<OrgRole>()?,
        None => OrgRole::Member,
    };

    state
        .service
        .accounts()
        .add_member(auth.user_id, &org, &request.username, role)
        .await?;
    Ok(StatusCode::CREATED)
}

/// GET /api/orgs/:org/packages
pub async fn list_packages(
    State(state): State<AppState>,
    Path(org): Path<String>,
) -> HttpResult<Json<ApiResponse<Vec<PackageSummary>>>> {
    let packages = state.service.resolver().list_packages(&org).await?;
    Ok(Json(ApiResponse::success(packages)))
}
