//! rusty-archive/crates/ra-api/src/middleware.rs Middleware
//!
//! Admin authentication for privileged routes.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use ra_core::AppError;
use secrecy::ExposeSecret;

use crate::error::ApiError;
use crate::AppState;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Rejects the request unless `X-Admin-Token` matches the configured token.
/// An empty configured token rejects everything.
pub async fn admin_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let expected = state.admin_token.expose_secret();
    let provided = request
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if expected.is_empty() || provided != expected {
        tracing::warn!(path = %request.uri().path(), "rejected admin request");
        return Err(AppError::Unauthorized("invalid admin token".to_string()).into());
    }
    Ok(next.run(request).await)
}
