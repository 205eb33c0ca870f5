//! `POST /sync/scheduled` — periodic sweep entry point. Invoked by the
//! in-process interval loop in `main`, but also exposed over HTTP so an
//! external scheduler can trigger a sweep on demand.

use crate::engine::SharedEngine;
use crate::error::SyncError;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use axum::Router;
use serde::{Deserialize, Serialize};

pub fn routes() -> Router<SharedEngine> {
    Router::new().route("/sync/scheduled", post(handle_scheduled_sync))
}

#[derive(Debug, Deserialize, Default)]
struct ScheduledSyncParams {
    #[serde(default)]
    mode: SweepMode,
}

#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum SweepMode {
    #[default]
    Full,
    RetryFailed,
}

#[derive(Serialize)]
struct ScheduledSyncResponse {
    synced: usize,
    failed: usize,
    conflicts: usize,
}

async fn handle_scheduled_sync(State(engine): State<SharedEngine>, Query(params): Query<ScheduledSyncParams>) -> Response {
    match run_sweep(&engine, &params.mode).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => {
            let status = axum::http::StatusCode::from_u16(err.status_code()).unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(&err)).into_response()
        }
    }
}

async fn run_sweep(engine: &SharedEngine, mode: &SweepMode) -> Result<ScheduledSyncResponse, SyncError> {
    let outcomes = match mode {
        SweepMode::Full => engine.issues.full_sync().await?,
        SweepMode::RetryFailed => engine.issues.retry_failed_syncs().await?,
    };

    let synced = outcomes.iter().filter(|o| o.success).count();
    let conflicts = outcomes.iter().filter(|o| o.conflicts_detected).count();
    let failed = outcomes.len() - synced;

    Ok(ScheduledSyncResponse { synced, failed, conflicts })
}
