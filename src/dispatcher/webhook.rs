//! `POST /webhook/:side` — inbound issue and comment events.

use crate::engine::SharedEngine;
use crate::error::SyncError;
use crate::models::Side;
use crate::reconcile::comment::CommentEvent;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use axum::Router;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

const RELEVANT_EVENTS: &[&str] = &["jira:issue_created", "jira:issue_updated", "jira:issue_deleted"];

pub fn routes() -> Router<SharedEngine> {
    Router::new().route("/webhook/{side}", post(handle_webhook))
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(rename = "webhookEvent")]
    webhook_event: String,
    issue: Option<IssueRef>,
    comment: Option<CommentRef>,
}

#[derive(Debug, Deserialize)]
struct IssueRef {
    key: String,
}

#[derive(Debug, Deserialize)]
struct CommentRef {
    id: String,
}

#[derive(Serialize)]
struct WebhookResponse {
    message: String,
    sync_id: Option<String>,
}

async fn handle_webhook(
    State(engine): State<SharedEngine>,
    Path(side): Path<String>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    match dispatch(&engine, &side, &headers, &body).await {
        Ok(response) => response,
        Err(err) => error_response(&err),
    }
}

async fn dispatch(engine: &SharedEngine, side: &str, headers: &HeaderMap, body: &[u8]) -> Result<Response, SyncError> {
    let signature = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !verify_webhook_signature(body, signature, &engine.config.webhook_secret) {
        return Ok((StatusCode::UNAUTHORIZED, Json(serde_json::json!({"error": "invalid signature"}))).into_response());
    }

    let source_side: Side = side.parse()?;
    let payload: WebhookPayload = serde_json::from_slice(body).map_err(|e| SyncError::invalid_input(e.to_string()))?;

    if let Some(comment) = &payload.comment {
        if let Some(issue) = &payload.issue {
            if engine.config.sync_comments {
                if let Some(event) = comment_event(&payload.webhook_event) {
                    engine.comments.sync_comment(&issue.key, &comment.id, source_side, event).await?;
                }
            }
            return Ok(Json(WebhookResponse { message: "comment event processed".into(), sync_id: None }).into_response());
        }
    }

    if !RELEVANT_EVENTS.contains(&payload.webhook_event.as_str()) {
        return Ok(Json(WebhookResponse { message: "event skipped".into(), sync_id: None }).into_response());
    }

    let Some(issue) = payload.issue else {
        return Ok((StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": "no issue key found"}))).into_response());
    };

    let outcome = engine.issues.sync_issue(&issue.key, source_side).await?;
    if outcome.success {
        Ok(Json(WebhookResponse { message: "sync completed".into(), sync_id: Some(outcome.record.sync_id) }).into_response())
    } else {
        let status = if outcome.conflicts_detected { StatusCode::CONFLICT } else { StatusCode::INTERNAL_SERVER_ERROR };
        Ok((status, Json(serde_json::json!({"error": "sync failed", "message": outcome.error_message}))).into_response())
    }
}

fn comment_event(webhook_event: &str) -> Option<CommentEvent> {
    match webhook_event {
        "comment_created" => Some(CommentEvent::Created),
        "comment_updated" => Some(CommentEvent::Updated),
        "comment_deleted" => Some(CommentEvent::Deleted),
        _ => None,
    }
}

/// Verify the `X-Hub-Signature-256` header against the raw body: HMAC-SHA256
/// over the body with the shared webhook secret, `sha256=` prefix optional
/// on the received header value.
fn verify_webhook_signature(body: &[u8], signature: &str, secret: &str) -> bool {
    if signature.is_empty() {
        return false;
    }
    let signature = signature.strip_prefix("sha256=").unwrap_or(signature);

    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(body);

    let Ok(expected) = hex_decode(signature) else { return false };
    mac.verify_slice(&expected).is_ok()
}

fn hex_decode(s: &str) -> Result<Vec<u8>, ()> {
    if s.len() % 2 != 0 {
        return Err(());
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| ()))
        .collect()
}

fn error_response(err: &SyncError) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(err)).into_response()
}
