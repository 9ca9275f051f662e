//! EmberLedger API server binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use ember_common::config::AppConfig;
use ember_engine::{InMemoryBank, LendingEngine};
use ember_notifier::WebhookNotifier;

use ember_api::routes::create_router;
use ember_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("ember_api=debug,ember_engine=debug,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting EmberLedger API server...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Build the engine over the in-memory bank
    let engine = LendingEngine::new(config.owner_address, Box::new(InMemoryBank::new()));
    tracing::info!(owner = %config.owner_address, "ledger engine created");

    // Optional webhook notifier for ledger events
    let notifier = config
        .event_webhook_url
        .clone()
        .map(|url| Arc::new(WebhookNotifier::new(url)));
    if notifier.is_some() {
        tracing::info!("event webhook delivery enabled");
    }

    // Build application state
    let state = AppState::new(Arc::new(RwLock::new(engine)), notifier);

    // Build router
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
