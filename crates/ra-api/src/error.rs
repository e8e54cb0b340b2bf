//! Maps `AppError` onto HTTP responses of the form `{"error": "..."}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ra_core::AppError;
use serde_json::json;

/// Wrapper so handlers can use `?` on core results.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::UnknownSource(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Source(_) => StatusCode::BAD_GATEWAY,
            AppError::ConstraintViolation(_) => StatusCode::CONFLICT,
            AppError::StorageUnavailable(_) | AppError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let message = match &self.0 {
            // keep the bare reason for the common client-facing cases
            AppError::NotFound(..) => "not found".to_string(),
            AppError::UnknownSource(_) => "unknown source".to_string(),
            AppError::Unauthorized(_) => "unauthorized".to_string(),
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
