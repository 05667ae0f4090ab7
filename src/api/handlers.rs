use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    jobs::{JobKind, JobView},
    models::RecommendedItem,
};

use super::AppState;

/// Body of an accepted run; poll `GET /jobs` for progress
#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub name: JobKind,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub name: JobKind,
    /// `false` when the job was not running
    pub cancelled: bool,
}

pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Status of every job
pub async fn list_jobs(State(state): State<AppState>) -> Json<Vec<JobView>> {
    Json(state.jobs.statuses().await)
}

/// Starts a job in the background; a run already in progress is superseded
pub async fn run_job(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<(StatusCode, Json<RunResponse>)> {
    let kind: JobKind = name.parse()?;
    state.jobs.trigger(kind);
    tracing::info!(job = %kind, "Run requested");

    Ok((StatusCode::ACCEPTED, Json(RunResponse { name: kind })))
}

pub async fn cancel_job(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<CancelResponse>> {
    let kind: JobKind = name.parse()?;
    let cancelled = state.jobs.cancel(kind).await;
    tracing::info!(job = %kind, cancelled, "Cancel requested");

    Ok(Json(CancelResponse {
        name: kind,
        cancelled,
    }))
}

pub async fn list_recommendations(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<RecommendedItem>>> {
    Ok(Json(state.recommendations.list_recommended().await?))
}

/// Pins a recommendation so regeneration keeps it
pub async fn keep_recommendation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<RecommendedItem>> {
    Ok(Json(state.recommendations.set_keep(id, true).await?))
}

pub async fn unkeep_recommendation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<RecommendedItem>> {
    Ok(Json(state.recommendations.set_keep(id, false).await?))
}

/// Marks a recommendation for deletion by the next update run
pub async fn remove_recommendation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<RecommendedItem>> {
    Ok(Json(state.recommendations.mark_for_removal(id).await?))
}
