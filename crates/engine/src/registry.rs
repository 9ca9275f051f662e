//! Market registry operations.
//!
//! Markets are created once and keep their identity forever; only the
//! collateral factor and the informational rates change afterwards. No
//! operation clears `is_active` — deactivation is not part of the observed
//! protocol surface.

use alloy::primitives::{Address, U256};

use ember_common::error::LedgerError;
use ember_common::types::{BPS_DENOMINATOR, LedgerEvent, Market};

use crate::store::LedgerStore;

/// List a new market for `asset`.
pub fn add_market(
    store: &mut LedgerStore,
    asset: Address,
    collateral_factor_bps: u64,
    supply_rate_bps: u64,
    borrow_rate_bps: u64,
) -> Result<(), LedgerError> {
    if asset == Address::ZERO {
        return Err(LedgerError::InvalidAsset);
    }
    if collateral_factor_bps > BPS_DENOMINATOR {
        return Err(LedgerError::InvalidCollateralFactor(collateral_factor_bps));
    }
    if store.market(asset).is_some_and(|market| market.is_active) {
        return Err(LedgerError::MarketExists(asset));
    }

    store.insert_market(Market {
        asset,
        total_supply: U256::ZERO,
        total_borrow: U256::ZERO,
        supply_rate_bps,
        borrow_rate_bps,
        collateral_factor_bps,
        is_active: true,
    });
    store.record(LedgerEvent::MarketAdded {
        asset,
        collateral_factor_bps,
        supply_rate_bps,
        borrow_rate_bps,
    });

    tracing::info!(
        %asset,
        collateral_factor_bps,
        supply_rate_bps,
        borrow_rate_bps,
        "market listed"
    );
    Ok(())
}

/// Overwrite the mutable parameters of an active market. Totals are
/// untouched.
pub fn update_market(
    store: &mut LedgerStore,
    asset: Address,
    collateral_factor_bps: u64,
    supply_rate_bps: u64,
    borrow_rate_bps: u64,
) -> Result<(), LedgerError> {
    if !store.market(asset).is_some_and(|market| market.is_active) {
        return Err(LedgerError::MarketInactive(asset));
    }
    if collateral_factor_bps > BPS_DENOMINATOR {
        return Err(LedgerError::InvalidCollateralFactor(collateral_factor_bps));
    }

    if let Some(market) = store.market_mut(asset) {
        market.collateral_factor_bps = collateral_factor_bps;
        market.supply_rate_bps = supply_rate_bps;
        market.borrow_rate_bps = borrow_rate_bps;
    }
    store.record(LedgerEvent::MarketUpdated {
        asset,
        collateral_factor_bps,
    });
    store.record(LedgerEvent::RatesUpdated {
        asset,
        supply_rate_bps,
        borrow_rate_bps,
    });

    tracing::info!(
        %asset,
        collateral_factor_bps,
        supply_rate_bps,
        borrow_rate_bps,
        "market parameters updated"
    );
    Ok(())
}
