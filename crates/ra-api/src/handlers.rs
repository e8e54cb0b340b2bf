//! # ra-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the archiver /
//! thread store.

use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::Json;
use ra_core::{parse_interval, Thread, Watch};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::AppState;

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct WatchParams {
    pub every: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScanParams {
    pub limit: Option<i64>,
    #[serde(default)]
    pub watch: bool,
    pub every: Option<String>,
}

fn interval_or_default(state: &AppState, every: Option<&str>) -> Result<Duration, ApiError> {
    match every {
        Some(raw) if !raw.is_empty() => Ok(parse_interval(raw)?),
        _ => Ok(state.default_every),
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

pub async fn list_sources(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.archiver.sources().names())
}

pub async fn list_threads(
    State(state): State<AppState>,
    Path(board): Path<String>,
) -> ApiResult<Vec<Thread>> {
    Ok(Json(state.store.list_threads(&board).await?))
}

pub async fn get_thread(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Thread> {
    Ok(Json(state.store.get_thread(&id).await?))
}

/// Ad-hoc fetch-and-save of one thread.
pub async fn fetch_thread(
    State(state): State<AppState>,
    Path((source, board, thread_id)): Path<(String, String, String)>,
) -> ApiResult<Value> {
    let thread = state.archiver.fetch_now(&source, &board, &thread_id).await?;
    Ok(Json(json!({ "ok": true, "saved_id": thread.id })))
}

pub async fn add_watch(
    State(state): State<AppState>,
    Path((source, board, thread_id)): Path<(String, String, String)>,
    Query(params): Query<WatchParams>,
) -> ApiResult<Value> {
    let every = interval_or_default(&state, params.every.as_deref())?;
    let watch = Watch::new(source, board, thread_id, every);
    state.archiver.add_watch(watch.clone()).await;
    Ok(Json(json!({ "ok": true, "watch": watch })))
}

pub async fn remove_watch(
    State(state): State<AppState>,
    Path((source, board, thread_id)): Path<(String, String, String)>,
) -> ApiResult<Value> {
    // the interval is not part of the registry key
    let watch = Watch::new(source, board, thread_id, Duration::ZERO);
    let removed = state.archiver.remove_watch(&watch).await;
    Ok(Json(json!({ "ok": true, "removed": removed })))
}

pub async fn list_watches(State(state): State<AppState>) -> Json<Vec<Watch>> {
    let mut watches = state.archiver.list_watches().await;
    watches.sort_by_key(|w| w.key().to_string());
    Json(watches)
}

/// Fetches a board catalog, saves every thread in it and optionally watches them.
pub async fn scan_board(
    State(state): State<AppState>,
    Path((source, board)): Path<(String, String)>,
    Query(params): Query<ScanParams>,
) -> ApiResult<Value> {
    let watch_every = if params.watch {
        Some(interval_or_default(&state, params.every.as_deref())?)
    } else {
        None
    };
    let report = state
        .archiver
        .scan_board(&source, &board, params.limit.unwrap_or(0), watch_every)
        .await?;
    Ok(Json(json!({ "ok": true, "scanned": report.scanned, "saved": report.saved })))
}
