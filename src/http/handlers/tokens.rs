//! API token management handlers

use crate::core::models::{ApiToken, IssuedToken};
use crate::http::auth::AuthContext;
use crate::http::errors::{HttpError, HttpResult};
use crate::http::handlers::AppState;
use crate::http::models::{ApiResponse, CreateTokenRequest};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

/// GET /api/tokens
pub async fn list_tokens(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> HttpResult<Json<ApiResponse<Vec<ApiToken>>>> {
    let tokens = state.service.tokens().list_tokens(auth.user_id).await?;
    Ok(Json(ApiResponse::success(tokens)))
}

/// POST /api/tokens - The raw token appears in this response only
pub async fn create_token(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<CreateTokenRequest>, JsonRejection>,
) -> HttpResult<(StatusCode, Json<ApiResponse<IssuedToken>>)> {
    let Json(request) = payload?;
    request.validate()?;

    let issued = state
        .service
        .tokens()
        .issue_token(auth.user_id, request.label.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(issued))))
}

/// DELETE /api/tokens/:id
pub async fn revoke_token(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(token_id): Path<String>,
) -> HttpResult<StatusCode> {
    let token_id = Uuid::parse_str(&token_id)
        .map_err(|_| HttpError::BadRequest(format!("Invalid token id '{}'", token_id)))?;

    state
        .service
        .tokens()
        .revoke_token(token_id, auth.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
