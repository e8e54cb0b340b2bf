//! # ra-api
//!
//! The HTTP routing layer. Reads go straight to the thread store; anything
//! that fetches or touches watches goes through the archiver and requires the
//! admin token.

pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use ra_core::{Archiver, ThreadStore};
use secrecy::SecretString;
use tower_http::trace::TraceLayer;

/// State shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ThreadStore>,
    pub archiver: Arc<Archiver>,
    pub admin_token: Arc<SecretString>,
    /// Interval for watch requests that do not name one
    pub default_every: Duration,
}

/// Builds the full router.
///
/// # Developer Note
/// Admin routes are grouped in their own router so the auth layer wraps only
/// them; public reads stay unauthenticated.
pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/api/fetch/{source}/{board}/{thread_id}", post(handlers::fetch_thread))
        .route(
            "/api/watch/{source}/{board}/{thread_id}",
            post(handlers::add_watch).delete(handlers::remove_watch),
        )
        .route("/api/watches", get(handlers::list_watches))
        .route("/api/scan/{source}/{board}", post(handlers::scan_board))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::admin_auth,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/sources", get(handlers::list_sources))
        .route("/api/threads/{board}", get(handlers::list_threads))
        .route("/api/thread/{id}", get(handlers::get_thread))
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
