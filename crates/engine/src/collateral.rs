//! Collateralization calculator.
//!
//! Pure functions over the ledger store. Every safety gate (withdraw,
//! borrow, liquidation eligibility) derives its answer from the same
//! weighted-sum walk so the live ratio and the simulated post-operation
//! ratios cannot drift apart.
//!
//! The ratio is expressed in basis points: weighted collateral value times
//! 10000 over raw borrow value, rounding toward zero. With no borrow the
//! ratio is the infinite sentinel `U256::MAX` — nothing to be unsafe
//! against.

use alloy::primitives::{Address, U256};

use ember_common::error::LedgerError;
use ember_common::types::{BPS_DENOMINATOR, LIQUIDATION_THRESHOLD_BPS};

use crate::store::LedgerStore;

/// Simulated balance change applied while re-deriving account totals.
#[derive(Debug, Clone, Copy)]
enum Adjustment {
    None,
    /// Deposit in `asset` reduced by `by`, floored at zero.
    ReducedDeposit { asset: Address, by: U256 },
    /// Borrow in `asset` increased by `by`.
    AddedBorrow { asset: Address, by: U256 },
}

/// Walk every active market in listing order, accumulating the account's
/// weighted collateral value and raw borrow value.
fn weighted_totals(
    store: &LedgerStore,
    account: Address,
    adjustment: Adjustment,
) -> Result<(U256, U256), LedgerError> {
    let denominator = U256::from(BPS_DENOMINATOR);
    let mut collateral_value = U256::ZERO;
    let mut borrow_value = U256::ZERO;

    for &asset in store.listed_assets() {
        let Some(market) = store.market(asset) else {
            continue;
        };
        if !market.is_active {
            continue;
        }

        let mut deposited = store.deposit_of(account, asset);
        let mut borrowed = store.borrow_of(account, asset);
        match adjustment {
            Adjustment::ReducedDeposit { asset: target, by } if target == asset => {
                deposited = deposited.saturating_sub(by);
            }
            Adjustment::AddedBorrow { asset: target, by } if target == asset => {
                borrowed = borrowed
                    .checked_add(by)
                    .ok_or(LedgerError::ArithmeticOverflow)?;
            }
            _ => {}
        }

        let weighted = deposited
            .checked_mul(U256::from(market.collateral_factor_bps))
            .ok_or(LedgerError::ArithmeticOverflow)?
            .checked_div(denominator)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        collateral_value = collateral_value
            .checked_add(weighted)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        borrow_value = borrow_value
            .checked_add(borrowed)
            .ok_or(LedgerError::ArithmeticOverflow)?;
    }

    Ok((collateral_value, borrow_value))
}

fn ratio_of(collateral_value: U256, borrow_value: U256) -> Result<U256, LedgerError> {
    if borrow_value.is_zero() {
        return Ok(U256::MAX);
    }
    collateral_value
        .checked_mul(U256::from(BPS_DENOMINATOR))
        .ok_or(LedgerError::ArithmeticOverflow)?
        .checked_div(borrow_value)
        .ok_or(LedgerError::ArithmeticOverflow)
}

/// Current collateralization ratio of an account, in basis points.
pub fn collateralization_ratio(
    store: &LedgerStore,
    account: Address,
) -> Result<U256, LedgerError> {
    let (collateral_value, borrow_value) = weighted_totals(store, account, Adjustment::None)?;
    ratio_of(collateral_value, borrow_value)
}

/// Would the position stay safe after withdrawing `amount` of `asset`?
pub fn can_withdraw(
    store: &LedgerStore,
    account: Address,
    asset: Address,
    amount: U256,
) -> Result<bool, LedgerError> {
    if collateralization_ratio(store, account)? == U256::MAX {
        return Ok(true);
    }
    let (collateral_value, borrow_value) =
        weighted_totals(store, account, Adjustment::ReducedDeposit { asset, by: amount })?;
    Ok(ratio_of(collateral_value, borrow_value)? >= U256::from(LIQUIDATION_THRESHOLD_BPS))
}

/// Would the position stay safe after borrowing `amount` more of `asset`?
///
/// A position with no existing borrow is approved outright; the resulting
/// ratio of that first borrow is deliberately not re-checked.
pub fn can_borrow(
    store: &LedgerStore,
    account: Address,
    asset: Address,
    amount: U256,
) -> Result<bool, LedgerError> {
    if collateralization_ratio(store, account)? == U256::MAX {
        return Ok(true);
    }
    let (collateral_value, borrow_value) =
        weighted_totals(store, account, Adjustment::AddedBorrow { asset, by: amount })?;
    Ok(ratio_of(collateral_value, borrow_value)? >= U256::from(LIQUIDATION_THRESHOLD_BPS))
}

/// A position is liquidatable when its ratio has fallen below the
/// liquidation threshold. The infinite ratio is never liquidatable.
pub fn is_liquidatable(store: &LedgerStore, account: Address) -> Result<bool, LedgerError> {
    Ok(collateralization_ratio(store, account)? < U256::from(LIQUIDATION_THRESHOLD_BPS))
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
    fn test_ratio_infinite_with_no_borrow() {
        let asset = Address::repeat_byte(1);
        let mut store = make_store(&[(asset, 8_000)]);
        store.set_deposit(account(), asset, U256::from(1_000));
        assert_eq!(
            collateralization_ratio(&store, account()).unwrap(),
            U256::MAX
        );
    }

    #[test]
    fn test_ratio_infinite_for_untouched_account() {
        let store = make_store(&[(Address::repeat_byte(1), 8_000)]);
        assert_eq!(
            collateralization_ratio(&store, account()).unwrap(),
            U256::MAX
        );
    }

    #[test]
    fn test_ratio_weights_deposits_by_collateral_factor() {
        let asset = Address::repeat_byte(1);
        let mut store = make_store(&[(asset, 8_000)]);
        store.set_deposit(account(), asset, U256::from(1_000));
        store.set_borrow(account(), asset, U256::from(400));
        // collateral 1000 * 80% = 800; ratio = 800 * 10000 / 400
        assert_eq!(
            collateralization_ratio(&store, account()).unwrap(),
            U256::from(20_000)
        );
    }

    #[test]
    fn test_ratio_sums_across_markets_and_rounds_down() {
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        let mut store = make_store(&[(a, 5_000), (b, 7_500)]);
        store.set_deposit(account(), a, U256::from(100));
        store.set_deposit(account(), b, U256::from(100));
        store.set_borrow(account(), b, U256::from(42));
        // collateral = 50 + 75 = 125; ratio = 1_250_000 / 42 = 29761 (floor)
        assert_eq!(
            collateralization_ratio(&store, account()).unwrap(),
            U256::from(29_761)
        );
    }

    #[test]
    fn test_inactive_market_excluded_from_ratio() {
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        let mut store = make_store(&[(a, 8_000), (b, 8_000)]);
        store.set_deposit(account(), a, U256::from(1_000));
        store.set_deposit(account(), b, U256::from(1_000));
        store.set_borrow(account(), a, U256::from(100));
        let with_both = collateralization_ratio(&store, account()).unwrap();
        store.market_mut(b).unwrap().is_active = false;
        let with_one = collateralization_ratio(&store, account()).unwrap();
        assert_eq!(with_both, U256::from(160_000));
        assert_eq!(with_one, U256::from(80_000));
    }

    #[test]
    fn test_can_withdraw_with_no_borrow_always_approves() {
        let asset = Address::repeat_byte(1);
        let mut store = make_store(&[(asset, 8_000)]);
        store.set_deposit(account(), asset, U256::from(1_000));
        assert!(can_withdraw(&store, account(), asset, U256::from(1_000)).unwrap());
    }

    #[test]
    fn test_can_withdraw_rejects_unsafe_reduction() {
        let asset = Address::repeat_byte(1);
        let mut store = make_store(&[(asset, 8_000)]);
        store.set_deposit(account(), asset, U256::from(1_000));
        store.set_borrow(account(), asset, U256::from(700));
        // withdrawing 200 leaves collateral 640 vs borrow 700 → 9142 >= 8000
        assert!(can_withdraw(&store, account(), asset, U256::from(200)).unwrap());
        // withdrawing 400 leaves collateral 480 vs borrow 700 → 6857 < 8000
        assert!(!can_withdraw(&store, account(), asset, U256::from(400)).unwrap());
    }

    #[test]
    fn test_can_withdraw_floors_simulated_deposit_at_zero() {
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        let mut store = make_store(&[(a, 8_000), (b, 10_000)]);
        store.set_deposit(account(), a, U256::from(100));
        store.set_deposit(account(), b, U256::from(1_000));
        store.set_borrow(account(), b, U256::from(500));
        // simulating a withdrawal larger than the deposit must not underflow
        assert!(can_withdraw(&store, account(), a, U256::from(10_000)).unwrap());
    }

    #[test]
    fn test_can_borrow_first_borrow_approved_outright() {
        let asset = Address::repeat_byte(1);
        let mut store = make_store(&[(asset, 8_000)]);
        store.set_deposit(account(), asset, U256::from(10));
        // no existing borrow → infinite ratio → approved regardless of size
        assert!(can_borrow(&store, account(), asset, U256::from(1_000_000)).unwrap());
    }

    #[test]
    fn test_can_borrow_checks_simulated_ratio() {
        let asset = Address::repeat_byte(1);
        let mut store = make_store(&[(asset, 8_000)]);
        store.set_deposit(account(), asset, U256::from(1_000));
        store.set_borrow(account(), asset, U256::from(900));
        // collateral 800; at borrow 1000 the ratio sits exactly on 8000
        assert!(can_borrow(&store, account(), asset, U256::from(100)).unwrap());
        assert!(!can_borrow(&store, account(), asset, U256::from(101)).unwrap());
    }

    #[test]
    fn test_is_liquidatable_below_threshold_only() {
        let asset = Address::repeat_byte(1);
        let mut store = make_store(&[(asset, 8_000)]);
        store.set_deposit(account(), asset, U256::from(1_000));
        store.set_borrow(account(), asset, U256::from(1_000));
        // ratio exactly 8000 → safe
        assert!(!is_liquidatable(&store, account()).unwrap());
        store.set_borrow(account(), asset, U256::from(1_001));
        assert!(is_liquidatable(&store, account()).unwrap());
    }

    #[test]
    fn test_infinite_ratio_never_liquidatable() {
        let asset = Address::repeat_byte(1);
        let mut store = make_store(&[(asset, 8_000)]);
        store.set_deposit(account(), asset, U256::from(1));
        assert!(!is_liquidatable(&store, account()).unwrap());
    }
}
