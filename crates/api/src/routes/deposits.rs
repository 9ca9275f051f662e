//! Signed-deposit route — the gasless entry point.
//!
//! The only mutating route: its authentication is the deposit authorization
//! itself. The submitted account must be the recovered signer, so there is
//! no separate session or token layer to check.

use alloy::primitives::Signature;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use ember_common::error::LedgerError;
use ember_engine::SignedAuthorization;

use crate::routes::{parse_address, parse_amount};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/deposits/signed", post(signed_deposit))
}

/// Request body for a signed deposit.
#[derive(Debug, Deserialize)]
pub struct SignedDepositRequest {
    /// The depositing account; must equal the signature's recovered signer
    pub account: String,
    pub asset: String,
    pub amount: String,
    pub nonce: u64,
    /// Unix timestamp (seconds) after which the authorization expires
    pub deadline: u64,
    /// 65-byte hex signature over the deposit digest
    pub signature: String,
}

/// Response for an accepted signed deposit.
#[derive(Debug, Serialize)]
pub struct SignedDepositResponse {
    pub status: &'static str,
    /// The account's nonce after this deposit
    pub next_nonce: u64,
}

/// POST /api/deposits/signed — Verify the authorization and execute the
/// deposit.
async fn signed_deposit(
    State(state): State<AppState>,
    Json(request): Json<SignedDepositRequest>,
) -> Result<Json<SignedDepositResponse>, LedgerError> {
    let account = parse_address(&request.account)?;
    let asset = parse_address(&request.asset)?;
    let amount = parse_amount(&request.amount)?;
    let signature: Signature = request
        .signature
        .parse()
        .map_err(|_| LedgerError::Validation("invalid signature encoding".to_string()))?;

    let authorization = SignedAuthorization {
        nonce: request.nonce,
        deadline: request.deadline,
        signature,
    };

    let mut engine = state.engine.write().await;
    engine.deposit_with_signature(account, asset, amount, &authorization)?;
    let next_nonce = engine.nonce(account);
    let record = engine.events().last().cloned();
    drop(engine);

    tracing::info!(%account, %asset, %amount, next_nonce, "signed deposit accepted via API");

    if let (Some(notifier), Some(record)) = (state.notifier.clone(), record) {
        tokio::spawn(async move {
            if let Err(error) = notifier.deliver(&record).await {
                tracing::warn!(%error, "event webhook delivery failed");
            }
        });
    }

    Ok(Json(SignedDepositResponse {
        status: "ok",
        next_nonce,
    }))
}
