//! Admin endpoint handlers.
//!
//! Thin adapters over `Registry`; every response body is JSON.
//!
//! Registry writes persist to disk synchronously, so mutating handlers run
//! them on the blocking pool and request filtering keeps its workers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::error::ApiError;
use crate::http::server::AppState;
use crate::rules::{engine, Registry, Rule, RulePatch};

#[derive(Debug, Serialize, Deserialize)]
pub struct EnabledStatus {
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct EnabledParams {
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct ReloadStatus {
    pub reloaded: bool,
}

#[derive(Debug, Serialize)]
pub struct SaveStatus {
    pub saved: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteStatus {
    pub deleted: bool,
}

#[derive(Debug, Deserialize)]
pub struct TestParams {
    pub query: Option<String>,
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TestVerdict {
    pub blocked: bool,
}

/// Run a registry write off the async workers.
async fn write<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&Registry) -> T + Send + 'static,
    T: Send + 'static,
{
    let registry = state.registry.clone();
    Ok(tokio::task::spawn_blocking(move || op(registry.as_ref())).await?)
}

pub async fn get_enabled(State(state): State<AppState>) -> Json<EnabledStatus> {
    Json(EnabledStatus {
        enabled: state.registry.is_enabled(),
    })
}

pub async fn set_enabled(
    State(state): State<AppState>,
    Query(params): Query<EnabledParams>,
) -> Result<Json<EnabledStatus>, ApiError> {
    let enabled = write(&state, move |registry| {
        registry.set_enabled(params.enabled);
        registry.is_enabled()
    })
    .await?;
    Ok(Json(EnabledStatus { enabled }))
}

pub async fn reload_rules(State(state): State<AppState>) -> Result<Json<ReloadStatus>, ApiError> {
    write(&state, |registry| registry.reload_from_file()).await??;
    Ok(Json(ReloadStatus { reloaded: true }))
}

pub async fn save_rules(State(state): State<AppState>) -> Result<Json<SaveStatus>, ApiError> {
    write(&state, |registry| registry.save_to_file()).await??;
    Ok(Json(SaveStatus { saved: true }))
}

pub async fn list_rules(State(state): State<AppState>) -> Json<Vec<Rule>> {
    Json(state.registry.list_rules().to_vec())
}

pub async fn get_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Rule>, ApiError> {
    state.registry.get_rule(&id).map(Json).ok_or(ApiError::NotFound)
}

pub async fn create_rule(
    State(state): State<AppState>,
    Json(rule): Json<Rule>,
) -> Result<Json<Rule>, ApiError> {
    let created = write(&state, move |registry| registry.create_rule(rule)).await?;
    Ok(Json(created))
}

pub async fn update_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<RulePatch>,
) -> Result<Json<Rule>, ApiError> {
    write(&state, move |registry| registry.update_rule(&id, &patch))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

pub async fn delete_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteStatus>, ApiError> {
    let deleted = write(&state, move |registry| registry.delete_rule(&id)).await?;
    Ok(Json(DeleteStatus { deleted }))
}

/// Dry run against query/path block rules; the live pipeline is not involved.
pub async fn test_request(
    State(state): State<AppState>,
    Query(params): Query<TestParams>,
) -> Json<TestVerdict> {
    let rules = state.registry.list_rules();
    Json(TestVerdict {
        blocked: engine::would_block(&rules, params.query.as_deref(), params.path.as_deref()),
    })
}
