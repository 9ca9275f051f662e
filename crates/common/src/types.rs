use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Basis-point denominator: 10000 = 100%.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Positions with a collateralization ratio below this are liquidatable.
pub const LIQUIDATION_THRESHOLD_BPS: u64 = 8_000;

/// Bonus collateral granted to the liquidator, on top of the repaid amount.
pub const LIQUIDATION_PENALTY_BPS: u64 = 500;

/// A listed lending market for one asset.
///
/// Identity is immutable after listing; only the risk and rate parameters
/// change through `update_market`. `total_supply` / `total_borrow` mirror the
/// per-account deposit and borrow ledgers at all times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub asset: Address,
    pub total_supply: U256,
    pub total_borrow: U256,
    /// Supply APY in basis points. Informational only; the ledger stores it
    /// but performs no accrual.
    pub supply_rate_bps: u64,
    /// Borrow APY in basis points, informational like `supply_rate_bps`.
    pub borrow_rate_bps: u64,
    /// Fraction of a deposit's value counted as usable collateral, <= 10000.
    pub collateral_factor_bps: u64,
    pub is_active: bool,
}

/// Denormalized per-account totals across all markets.
///
/// The per-(account, asset) balance maps are the ground truth; these sums
/// are maintained in lockstep by every operation. `is_active` is derived,
/// never set independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPosition {
    pub total_deposited: U256,
    pub total_borrowed: U256,
    pub last_update: DateTime<Utc>,
    pub is_active: bool,
}

impl Default for AccountPosition {
    fn default() -> Self {
        Self {
            total_deposited: U256::ZERO,
            total_borrowed: U256::ZERO,
            last_update: DateTime::UNIX_EPOCH,
            is_active: false,
        }
    }
}

/// Notifications emitted by the ledger, one per successful state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    MarketAdded {
        asset: Address,
        collateral_factor_bps: u64,
        supply_rate_bps: u64,
        borrow_rate_bps: u64,
    },
    MarketUpdated {
        asset: Address,
        collateral_factor_bps: u64,
    },
    RatesUpdated {
        asset: Address,
        supply_rate_bps: u64,
        borrow_rate_bps: u64,
    },
    Deposit {
        account: Address,
        asset: Address,
        amount: U256,
    },
    Withdraw {
        account: Address,
        asset: Address,
        amount: U256,
    },
    Borrow {
        account: Address,
        asset: Address,
        amount: U256,
    },
    Repay {
        account: Address,
        asset: Address,
        amount: U256,
    },
    Liquidate {
        liquidator: Address,
        account: Address,
        debt_asset: Address,
        repaid: U256,
        collateral_asset: Address,
        seized: U256,
    },
}

/// An entry in the append-only event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: Uuid,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: LedgerEvent,
}

/// Alert severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Human-readable notification payload ready for webhook delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Short title (e.g., "Position Liquidated")
    pub title: String,
    /// Detailed body message
    pub body: String,
    /// Alert severity
    pub severity: Severity,
}
