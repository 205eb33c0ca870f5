//! `POST /sync/manual` — operator-triggered sync and conflict resolution.
//! Two request shapes share one route, distinguished by which fields are
//! present.

use crate::engine::SharedEngine;
use crate::error::SyncError;
use crate::models::Side;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use axum::Router;
use serde::Deserialize;

pub fn routes() -> Router<SharedEngine> {
    Router::new().route("/sync/manual", post(handle_manual))
}

#[derive(Debug, Deserialize)]
struct ManualRequest {
    issue_key: Option<String>,
    source_instance: Option<String>,
    sync_id: Option<String>,
    resolution_direction: Option<String>,
}

async fn handle_manual(State(engine): State<SharedEngine>, Json(body): Json<ManualRequest>) -> Response {
    match run_manual(&engine, body).await {
        Ok(response) => response,
        Err(err) => error_response(&err),
    }
}

async fn run_manual(engine: &SharedEngine, body: ManualRequest) -> Result<Response, SyncError> {
    if let (Some(sync_id), Some(direction)) = (&body.sync_id, &body.resolution_direction) {
        let side: Side = direction.parse()?;
        let outcome = engine.issues.resolve_conflict(sync_id, side).await?;
        return Ok(outcome_response(&outcome));
    }

    if let (Some(issue_key), Some(source_instance)) = (&body.issue_key, &body.source_instance) {
        let side: Side = source_instance.parse()?;
        let outcome = engine.issues.sync_issue(issue_key, side).await?;
        return Ok(outcome_response(&outcome));
    }

    Err(SyncError::invalid_input(
        "request must include either {issue_key, source_instance} or {sync_id, resolution_direction}",
    ))
}

fn outcome_response(outcome: &crate::reconcile::SyncOutcome) -> Response {
    if outcome.success {
        Json(serde_json::json!({ "sync_id": outcome.record.sync_id, "status": outcome.record.status })).into_response()
    } else {
        let status = if outcome.conflicts_detected { StatusCode::CONFLICT } else { StatusCode::INTERNAL_SERVER_ERROR };
        (status, Json(serde_json::json!({ "error": outcome.error_message, "sync_id": outcome.record.sync_id }))).into_response()
    }
}

fn error_response(err: &SyncError) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(err)).into_response()
}
