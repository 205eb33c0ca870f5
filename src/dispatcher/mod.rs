//! The Dispatcher (C5): HTTP routes mapping inbound webhooks and operator
//! requests onto the reconcilers.

mod health;
mod manual;
mod scheduled;
mod webhook;

use crate::engine::SharedEngine;
use axum::Router;

pub fn router(engine: SharedEngine) -> Router {
    Router::new()
        .merge(webhook::routes())
        .merge(scheduled::routes())
        .merge(manual::routes())
        .merge(health::routes())
        .with_state(engine)
}
