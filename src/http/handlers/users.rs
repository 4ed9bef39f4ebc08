//! Registration and current-user handlers

use crate::core::accounts::Registration;
use crate::http::auth::AuthContext;
use crate::http::errors::HttpResult;
use crate::http::handlers::AppState;
use crate::http::models::{ApiResponse, MeResponse, MembershipResponse, RegisterRequest};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use validator::Validate;

/// POST /api/users - Register and receive a first token
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> HttpResult<(StatusCode, Json<ApiResponse<Registration>>)> {
    let Json(request) = payload?;
    request.validate()?;

    let registration = state
        .service
        .accounts()
        .register_user(&request.email, &request.username)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(registration))))
}

/// GET /api/me
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> HttpResult<Json<ApiResponse<MeResponse>>> {
    let accounts = state.service.accounts();
    let user = accounts.get_user(auth.user_id).await?;
    let organizations = accounts
        .memberships(auth.user_id)
        .await?
        .into_iter()
        .map(|(org, role)| MembershipResponse {
            org: org.name,
            role,
        })
        .collect();

    Ok(Json(ApiResponse::success(MeResponse {
        user,
        organizations,
    })))
}
