//! Liquidation engine.
//!
//! Liquidation repays part of an unsafe account's debt in exchange for a
//! penalty-boosted amount of a single collateral asset. Selection picks the
//! one active market where the account's weighted deposit value is highest;
//! listing order breaks ties (strict `>` keeps the first-listed winner).
//! If that single asset cannot cover the full seize amount the liquidation
//! is rejected outright — collateral spread across several assets is never
//! combined. A known economic limitation, kept for compatibility.

use alloy::primitives::{Address, U256};

use ember_common::error::LedgerError;
use ember_common::types::{BPS_DENOMINATOR, LIQUIDATION_PENALTY_BPS};

use crate::store::LedgerStore;

/// Collateral owed to the liquidator for repaying `repaid`:
/// `repaid * (10000 + penalty) / 10000`.
pub fn seize_amount(repaid: U256) -> Result<U256, LedgerError> {
    repaid
        .checked_mul(U256::from(BPS_DENOMINATOR + LIQUIDATION_PENALTY_BPS))
        .ok_or(LedgerError::ArithmeticOverflow)?
        .checked_div(U256::from(BPS_DENOMINATOR))
        .ok_or(LedgerError::ArithmeticOverflow)
}

/// Pick the account's best collateral asset: the active market maximizing
/// `deposit * collateral_factor / 10000`. Returns `None` when the account
/// holds no deposit with positive weighted value.
pub fn select_best_collateral(
    store: &LedgerStore,
    account: Address,
) -> Result<Option<Address>, LedgerError> {
    let mut best_asset: Option<Address> = None;
    let mut best_value = U256::ZERO;

    for &asset in store.listed_assets() {
        let Some(market) = store.market(asset) else {
            continue;
        };
        if !market.is_active {
            continue;
        }
        let deposited = store.deposit_of(account, asset);
        if deposited.is_zero() {
            continue;
        }
        let value = deposited
            .checked_mul(U256::from(market.collateral_factor_bps))
            .ok_or(LedgerError::ArithmeticOverflow)?
            .checked_div(U256::from(BPS_DENOMINATOR))
            .ok_or(LedgerError::ArithmeticOverflow)?;
        if value > best_value {
            best_value = value;
            best_asset = Some(asset);
        }
    }

    Ok(best_asset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_common::types::Market;

    fn account() -> Address {
        Address::repeat_byte(0xAB)
    }

    fn make_store(markets: &[(Address, u64)]) -> LedgerStore {
        let mut store = LedgerStore::new();
        for &(asset, collateral_factor_bps) in markets {
            store.insert_market(Market {
                asset,
                total_supply: U256::ZERO,
                total_borrow: U256::ZERO,
                supply_rate_bps: 0,
                borrow_rate_bps: 0,
                collateral_factor_bps,
                is_active: true,
            });
        }
        store
    }

    #[test]
    fn test_seize_amount_applies_penalty() {
        assert_eq!(seize_amount(U256::from(900)).unwrap(), U256::from(945));
        assert_eq!(seize_amount(U256::from(10_000)).unwrap(), U256::from(10_500));
    }

    #[test]
    fn test_seize_amount_rounds_down() {
        // 3 * 10500 / 10000 = 3.15 → 3
        assert_eq!(seize_amount(U256::from(3)).unwrap(), U256::from(3));
    }

    #[test]
    fn test_selects_highest_weighted_value() {
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        let mut store = make_store(&[(a, 5_000), (b, 8_000)]);
        store.set_deposit(account(), a, U256::from(1_000)); // value 500
        store.set_deposit(account(), b, U256::from(700)); // value 560
        assert_eq!(select_best_collateral(&store, account()).unwrap(), Some(b));
    }

    #[test]
    fn test_tie_goes_to_first_listed() {
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        let mut store = make_store(&[(a, 8_000), (b, 8_000)]);
        store.set_deposit(account(), a, U256::from(500));
        store.set_deposit(account(), b, U256::from(500));
        assert_eq!(select_best_collateral(&store, account()).unwrap(), Some(a));
    }

    #[test]
    fn test_no_deposits_means_no_collateral() {
        let store = make_store(&[(Address::repeat_byte(1), 8_000)]);
        assert_eq!(select_best_collateral(&store, account()).unwrap(), None);
    }

    #[test]
    fn test_zero_weighted_value_is_not_seizable() {
        let a = Address::repeat_byte(1);
        let mut store = make_store(&[(a, 0)]);
        store.set_deposit(account(), a, U256::from(1_000));
        assert_eq!(select_best_collateral(&store, account()).unwrap(), None);
    }

    #[test]
    fn test_inactive_market_skipped() {
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        let mut store = make_store(&[(a, 8_000), (b, 5_000)]);
        store.set_deposit(account(), a, U256::from(1_000));
        store.set_deposit(account(), b, U256::from(1_000));
        store.market_mut(a).unwrap().is_active = false;
        assert_eq!(select_best_collateral(&store, account()).unwrap(), Some(b));
    }
}
