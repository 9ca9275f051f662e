//! Market and listed-asset queries.

use alloy::primitives::Address;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use ember_common::error::LedgerError;
use ember_common::types::Market;

use crate::routes::parse_address;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/markets", get(list_markets))
        .route("/api/markets/{asset}", get(get_market))
        .route("/api/assets", get(list_assets))
}

/// GET /api/markets — All markets in listing order.
async fn list_markets(State(state): State<AppState>) -> Json<Vec<Market>> {
    let engine = state.engine.read().await;
    Json(engine.markets())
}

/// GET /api/markets/:asset — Single market snapshot.
async fn get_market(
    State(state): State<AppState>,
    Path(asset): Path<String>,
) -> Result<Json<Market>, LedgerError> {
    let asset = parse_address(&asset)?;
    let engine = state.engine.read().await;
    let market = engine
        .market(asset)
        .ok_or_else(|| LedgerError::NotFound(format!("no market for asset {asset}")))?;
    Ok(Json(market))
}

/// GET /api/assets — The supported-asset list, in listing order.
async fn list_assets(State(state): State<AppState>) -> Json<Vec<Address>> {
    let engine = state.engine.read().await;
    Json(engine.listed_assets())
}
