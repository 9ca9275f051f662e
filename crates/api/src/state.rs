//! Shared application state for the Axum API server.

use std::sync::Arc;

use tokio::sync::RwLock;

use ember_engine::LendingEngine;
use ember_notifier::WebhookNotifier;

/// Application state shared across all route handlers via Axum `State`.
///
/// The engine sits behind a single `RwLock`: reads run concurrently,
/// mutating operations serialize — the ledger's single-writer execution
/// model.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RwLock<LendingEngine>>,
    pub notifier: Option<Arc<WebhookNotifier>>,
}

impl AppState {
    pub fn new(
        engine: Arc<RwLock<LendingEngine>>,
        notifier: Option<Arc<WebhookNotifier>>,
    ) -> Self {
        Self { engine, notifier }
    }
}
