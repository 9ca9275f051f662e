//! Event log queries.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use ember_common::types::EventRecord;

use crate::state::AppState;

const DEFAULT_LIMIT: usize = 100;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/events", get(list_events))
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Maximum number of most-recent events to return (default: 100)
    pub limit: Option<usize>,
}

/// GET /api/events — The most recent ledger notifications, oldest first.
async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<EventRecord>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let engine = state.engine.read().await;
    let events = engine.events();
    let start = events.len().saturating_sub(limit);
    Json(events[start..].to_vec())
}
