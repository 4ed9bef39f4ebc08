//! HTTP error handling and conversion

use crate::core::service::{FieldErrors, ServiceError};
use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// HTTP error types
#[derive(Debug)]
pub enum HttpError {
    /// Authentication errors
    Unauthorized(String),
    Forbidden(String),

    /// Validation errors
    BadRequest(String),
    ValidationError(FieldErrors),

    NotFound(String),

    Conflict(String),

    /// Server errors; the message is logged, never returned
    InternalServerError(String),
}

impl HttpError {
    /// Convert to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            HttpError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            HttpError::Forbidden(_) => StatusCode::FORBIDDEN,
            HttpError::BadRequest(_) | HttpError::ValidationError(_) => StatusCode::BAD_REQUEST,
            HttpError::NotFound(_) => StatusCode::NOT_FOUND,
            HttpError::Conflict(_) => StatusCode::CONFLICT,
            HttpError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            HttpError::Unauthorized(_) => "UNAUTHORIZED",
            HttpError::Forbidden(_) => "FORBIDDEN",
            HttpError::BadRequest(_) => "BAD_REQUEST",
            HttpError::ValidationError(_) => "VALIDATION_ERROR",
            HttpError::NotFound(_) => "NOT_FOUND",
            HttpError::Conflict(_) => "CONFLICT",
            HttpError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            HttpError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            HttpError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            HttpError::ValidationError(errors) => write!(f, "Validation Error: {}", errors),
            HttpError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            HttpError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            HttpError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
        }
    }
}

impl std::error::Error for HttpError {}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        let (message, details) = match self {
            HttpError::ValidationError(errors) => {
                ("Validation failed".to_string(), Some(json!(errors)))
            }
            HttpError::InternalServerError(msg) => {
                error!("Internal server error: {}", msg);
                ("An internal error occurred".to_string(), None)
            }
            HttpError::Unauthorized(msg)
            | HttpError::Forbidden(msg)
            | HttpError::BadRequest(msg)
            | HttpError::NotFound(msg)
            | HttpError::Conflict(msg) => (msg, None),
        };

        let body = Json(json!({
            "success": false,
            "data": null,
            "error": {
                "code": error_code,
                "message": message,
                "details": details
            }
        }));

        (status, body).into_response()
    }
}

/// Convert service errors to HTTP errors
impl From<ServiceError> for HttpError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(errors) => HttpError::ValidationError(errors),
            ServiceError::Unauthorized => {
                HttpError::Unauthorized("Invalid or missing credentials".to_string())
            }
            ServiceError::Forbidden(msg) => HttpError::Forbidden(msg),
            ServiceError::NotFound(msg) => HttpError::NotFound(msg),
            ServiceError::Conflict(msg) => HttpError::Conflict(msg),
            err @ ServiceError::Integrity { .. } => HttpError::InternalServerError(err.to_string()),
            ServiceError::Storage(msg) | ServiceError::Database(msg) | ServiceError::Config(msg) => {
                HttpError::InternalServerError(msg)
            }
            ServiceError::Io(err) => HttpError::InternalServerError(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for HttpError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, field_errors) in errors.field_errors() {
            for e in field_errors.iter() {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({})", e.code));
                fields.add(&field, message);
            }
        }
        HttpError::ValidationError(fields)
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        HttpError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for HttpError {
    fn from(rejection: PathRejection) -> Self {
        HttpError::BadRequest(rejection.body_text())
    }
}

/// Result type alias for HTTP operations
pub type HttpResult<T> = Result<T, HttpError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_mapping() {
        let cases = [
            (ServiceError::invalid("org", "bad"), StatusCode::BAD_REQUEST),
            (ServiceError::Unauthorized, StatusCode::UNAUTHORIZED),
            (ServiceError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ServiceError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                ServiceError::Database("locked".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(HttpError::from(err).status_code(), status);
        }
    }

    #[tokio::test]
    async fn test_internal_errors_hide_details() {
        let response =
            HttpError::from(ServiceError::Database("disk I/O error".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "INTERNAL_SERVER_ERROR");
        assert!(!json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("disk"));
    }

    #[tokio::test]
    async fn test_validation_details_are_field_map() {
        let mut errors = FieldErrors::new();
        errors.add("org", "too short");
        errors.add("version", "not semver");
        let response = HttpError::ValidationError(errors).into_response();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"]["details"]["org"][0], "too short");
        assert_eq!(json["error"]["details"]["version"][0], "not semver");
    }
}
