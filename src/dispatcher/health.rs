//! `GET /health` — liveness and basic status.

use crate::engine::SharedEngine;
use crate::models::SyncStatus;
use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Serialize;

pub fn routes() -> Router<SharedEngine> {
    Router::new().route("/health", get(handle_health))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    left_project: String,
    right_project: String,
    pending_conflicts: usize,
    failed_syncs: usize,
}

async fn handle_health(State(engine): State<SharedEngine>) -> Json<HealthResponse> {
    let conflicts = engine.store.list_issue_records_by_status(SyncStatus::Conflict).await.map(|r| r.len()).unwrap_or(0);
    let failed = engine.store.list_issue_records_by_status(SyncStatus::Failed).await.map(|r| r.len()).unwrap_or(0);

    Json(HealthResponse {
        status: "ok",
        left_project: engine.config.left.project_key.clone(),
        right_project: engine.config.right.project_key.clone(),
        pending_conflicts: conflicts,
        failed_syncs: failed,
    })
}
