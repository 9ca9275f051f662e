pub mod accounts;
pub mod deposits;
pub mod events;
pub mod health;
pub mod markets;

use alloy::primitives::{Address, U256};
use axum::Router;

use ember_common::error::LedgerError;

use crate::state::AppState;

/// Build the complete API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(markets::router())
        .merge(accounts::router())
        .merge(deposits::router())
        .merge(events::router())
        .with_state(state)
}

/// Parse a path/query segment as an address.
pub(crate) fn parse_address(raw: &str) -> Result<Address, LedgerError> {
    raw.parse()
        .map_err(|_| LedgerError::Validation(format!("invalid address: {raw}")))
}

/// Parse a decimal (or 0x-hex) string as an amount.
pub(crate) fn parse_amount(raw: &str) -> Result<U256, LedgerError> {
    raw.parse()
        .map_err(|_| LedgerError::Validation(format!("invalid amount: {raw}")))
}
