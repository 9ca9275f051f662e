use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use alloy::primitives::Address;

/// Failure of the external asset-transfer collaborator.
///
/// Custody movements either fully apply or fail with one of these; there is
/// no partial-transfer outcome.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransferError {
    #[error("insufficient balance or allowance")]
    InsufficientBalance,

    #[error("{0}")]
    Other(String),
}

/// Error taxonomy for every ledger operation.
///
/// All failures are synchronous and operation-aborting: a rejected
/// precondition leaves the ledger exactly as it was. `Validation` and
/// `NotFound` exist for the API surface (malformed request input, missing
/// resources); everything else is produced by the engine itself.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    // Input validation
    #[error("amount must be greater than zero")]
    InvalidAmount,

    #[error("asset cannot be the zero address")]
    InvalidAsset,

    #[error("collateral factor {0} exceeds 10000 basis points")]
    InvalidCollateralFactor(u64),

    // State conflicts
    #[error("market already exists for asset {0}")]
    MarketExists(Address),

    #[error("no active market for asset {0}")]
    MarketInactive(Address),

    // Insufficiency
    #[error("deposit balance is smaller than the requested amount")]
    InsufficientDeposit,

    #[error("borrow balance is smaller than the requested amount")]
    InsufficientBorrow,

    #[error("market liquidity is smaller than the requested amount")]
    InsufficientLiquidity,

    #[error("borrow balance is smaller than the liquidation amount")]
    InsufficientBorrowToLiquidate,

    #[error("best collateral asset cannot cover the seize amount")]
    InsufficientCollateral,

    // Safety-gate rejections
    #[error("withdrawal would leave the position undercollateralized")]
    UnsafeWithdrawal,

    #[error("borrow would leave the position undercollateralized")]
    UnsafeBorrow,

    #[error("position is not liquidatable")]
    NotLiquidatable,

    #[error("account holds no seizable collateral")]
    NoCollateral,

    // Signed-authorization failures
    #[error("authorization nonce mismatch: expected {expected}, got {got}")]
    InvalidNonce { expected: u64, got: u64 },

    #[error("authorization deadline has passed")]
    SignatureExpired,

    #[error("signature does not recover to the acting account")]
    InvalidSignature,

    // Operational
    #[error("protocol is paused")]
    ProtocolPaused,

    #[error("caller is not the protocol owner")]
    Unauthorized,

    #[error("arithmetic overflow in ledger computation")]
    ArithmeticOverflow,

    #[error("asset transfer failed: {0}")]
    TransferFailed(#[from] TransferError),

    // API surface
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = match &self {
            LedgerError::InvalidAmount
            | LedgerError::InvalidAsset
            | LedgerError::InvalidCollateralFactor(_)
            | LedgerError::Validation(_) => StatusCode::BAD_REQUEST,

            LedgerError::MarketExists(_) => StatusCode::CONFLICT,

            LedgerError::MarketInactive(_)
            | LedgerError::InsufficientDeposit
            | LedgerError::InsufficientBorrow
            | LedgerError::InsufficientLiquidity
            | LedgerError::InsufficientBorrowToLiquidate
            | LedgerError::InsufficientCollateral
            | LedgerError::UnsafeWithdrawal
            | LedgerError::UnsafeBorrow
            | LedgerError::NotLiquidatable
            | LedgerError::NoCollateral => StatusCode::UNPROCESSABLE_ENTITY,

            LedgerError::InvalidNonce { .. }
            | LedgerError::SignatureExpired
            | LedgerError::InvalidSignature => StatusCode::UNAUTHORIZED,

            LedgerError::Unauthorized => StatusCode::FORBIDDEN,

            LedgerError::ProtocolPaused => StatusCode::SERVICE_UNAVAILABLE,

            LedgerError::ArithmeticOverflow => StatusCode::INTERNAL_SERVER_ERROR,

            LedgerError::TransferFailed(_) => StatusCode::BAD_GATEWAY,

            LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
        };

        let body = json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
