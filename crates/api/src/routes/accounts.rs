//! Account position and safety-check queries.

use alloy::primitives::{Address, U256};
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ember_common::error::LedgerError;

use crate::routes::{parse_address, parse_amount};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/accounts/{address}", get(account_summary))
        .route("/api/accounts/{address}/balances/{asset}", get(account_balances))
        .route("/api/accounts/{address}/nonce", get(account_nonce))
        .route("/api/accounts/{address}/checks/withdraw", get(check_withdraw))
        .route("/api/accounts/{address}/checks/borrow", get(check_borrow))
}

/// Account health view: totals, ratio, and liquidation eligibility.
#[derive(Debug, Serialize)]
pub struct AccountSummary {
    pub address: Address,
    pub total_deposited: U256,
    pub total_borrowed: U256,
    pub last_update: DateTime<Utc>,
    pub is_active: bool,
    /// Collateralization ratio in basis points; `null` when the account has
    /// no borrow (nothing to be unsafe against).
    pub collateralization_ratio_bps: Option<U256>,
    pub liquidatable: bool,
}

/// GET /api/accounts/:address — Position snapshot with risk figures.
async fn account_summary(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<AccountSummary>, LedgerError> {
    let address = parse_address(&address)?;
    let engine = state.engine.read().await;
    let position = engine.account(address);
    let ratio = engine.collateralization_ratio(address)?;
    Ok(Json(AccountSummary {
        address,
        total_deposited: position.total_deposited,
        total_borrowed: position.total_borrowed,
        last_update: position.last_update,
        is_active: position.is_active,
        collateralization_ratio_bps: (ratio != U256::MAX).then_some(ratio),
        liquidatable: engine.is_liquidatable(address)?,
    }))
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub deposited: U256,
    pub borrowed: U256,
}

/// GET /api/accounts/:address/balances/:asset — Per-asset balances.
async fn account_balances(
    State(state): State<AppState>,
    Path((address, asset)): Path<(String, String)>,
) -> Result<Json<BalanceResponse>, LedgerError> {
    let address = parse_address(&address)?;
    let asset = parse_address(&asset)?;
    let engine = state.engine.read().await;
    Ok(Json(BalanceResponse {
        deposited: engine.deposit_balance(address, asset),
        borrowed: engine.borrow_balance(address, asset),
    }))
}

#[derive(Debug, Serialize)]
pub struct NonceResponse {
    pub nonce: u64,
}

/// GET /api/accounts/:address/nonce — Current signed-authorization nonce.
async fn account_nonce(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<NonceResponse>, LedgerError> {
    let address = parse_address(&address)?;
    let engine = state.engine.read().await;
    Ok(Json(NonceResponse {
        nonce: engine.nonce(address),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SafetyCheckQuery {
    pub asset: String,
    pub amount: String,
}

#[derive(Debug, Serialize)]
pub struct SafetyCheckResponse {
    pub approved: bool,
}

/// GET /api/accounts/:address/checks/withdraw?asset=&amount= — Would the
/// withdrawal keep the position safe?
async fn check_withdraw(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<SafetyCheckQuery>,
) -> Result<Json<SafetyCheckResponse>, LedgerError> {
    let address = parse_address(&address)?;
    let asset = parse_address(&query.asset)?;
    let amount = parse_amount(&query.amount)?;
    let engine = state.engine.read().await;
    Ok(Json(SafetyCheckResponse {
        approved: engine.can_withdraw(address, asset, amount)?,
    }))
}

/// GET /api/accounts/:address/checks/borrow?asset=&amount= — Would the
/// borrow keep the position safe?
async fn check_borrow(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<SafetyCheckQuery>,
) -> Result<Json<SafetyCheckResponse>, LedgerError> {
    let address = parse_address(&address)?;
    let asset = parse_address(&query.asset)?;
    let amount = parse_amount(&query.amount)?;
    let engine = state.engine.read().await;
    Ok(Json(SafetyCheckResponse {
        approved: engine.can_borrow(address, asset, amount)?,
    }))
}
