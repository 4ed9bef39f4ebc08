//! Status and health endpoint handlers

use crate::core::service::RegistryService;
use crate::http::errors::HttpResult;
use crate::http::models::{ApiResponse, StatusResponse};
use axum::{extract::State, Json};
use std::sync::Arc;
use std::time::SystemTime;

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RegistryService>,
    pub start_time: SystemTime,
}

impl AppState {
    pub fn new(service: Arc<RegistryService>) -> Self {
        Self {
            service,
            start_time: SystemTime::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.start_time)
            .unwrap_or_default()
            .as_secs()
    }
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

/// GET /api/status
pub async fn status(State(state): State<AppState>) -> HttpResult<Json<ApiResponse<StatusResponse>>> {
    Ok(Json(ApiResponse::success(StatusResponse {
        status: "running".to_string(),
        version: crate::VERSION.to_string(),
        uptime_seconds: state.uptime_seconds(),
        storage: state.service.blobs().kind().to_string(),
    })))
}
