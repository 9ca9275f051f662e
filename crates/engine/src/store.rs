//! The ledger's single source of truth.
//!
//! `LedgerStore` owns every piece of mutable protocol state: the market
//! registry, the insertion-ordered listed-asset sequence, per-account
//! positions, the per-(account, asset) deposit/borrow balance maps, the
//! signed-authorization nonces, and the append-only event log.
//!
//! Entries are created implicitly (zero-valued) on first reference and never
//! deleted; "inactive" is always a derived flag, not a removal.

use std::collections::HashMap;

use alloy::primitives::{Address, U256};
use chrono::Utc;
use uuid::Uuid;

use ember_common::types::{AccountPosition, EventRecord, LedgerEvent, Market};

#[derive(Debug, Default)]
pub struct LedgerStore {
    markets: HashMap<Address, Market>,
    /// Listing order of markets: append-only, duplicate-free. Ratio
    /// computation and collateral selection iterate in this order, which
    /// makes tie-breaking deterministic.
    listed_assets: Vec<Address>,
    accounts: HashMap<Address, AccountPosition>,
    deposits: HashMap<(Address, Address), U256>,
    borrows: HashMap<(Address, Address), U256>,
    nonces: HashMap<Address, u64>,
    events: Vec<EventRecord>,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn market(&self, asset: Address) -> Option<&Market> {
        self.markets.get(&asset)
    }

    pub fn market_mut(&mut self, asset: Address) -> Option<&mut Market> {
        self.markets.get_mut(&asset)
    }

    /// Insert a market, appending its asset to the listing order if new.
    pub fn insert_market(&mut self, market: Market) {
        if !self.listed_assets.contains(&market.asset) {
            self.listed_assets.push(market.asset);
        }
        self.markets.insert(market.asset, market);
    }

    pub fn listed_assets(&self) -> &[Address] {
        &self.listed_assets
    }

    /// Snapshot of an account's position; zero-valued if never touched.
    pub fn position(&self, account: Address) -> AccountPosition {
        self.accounts.get(&account).cloned().unwrap_or_default()
    }

    pub fn position_mut(&mut self, account: Address) -> &mut AccountPosition {
        self.accounts.entry(account).or_default()
    }

    pub fn deposit_of(&self, account: Address, asset: Address) -> U256 {
        self.deposits
            .get(&(account, asset))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    pub fn set_deposit(&mut self, account: Address, asset: Address, amount: U256) {
        self.deposits.insert((account, asset), amount);
    }

    pub fn borrow_of(&self, account: Address, asset: Address) -> U256 {
        self.borrows
            .get(&(account, asset))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    pub fn set_borrow(&mut self, account: Address, asset: Address, amount: U256) {
        self.borrows.insert((account, asset), amount);
    }

    /// Current signed-authorization nonce for an account; starts at 0.
    pub fn nonce_of(&self, account: Address) -> u64 {
        self.nonces.get(&account).copied().unwrap_or(0)
    }

    /// Advance the nonce by one. Called only after a signed operation has
    /// fully succeeded, so a failed attempt never consumes the nonce.
    pub fn advance_nonce(&mut self, account: Address) {
        *self.nonces.entry(account).or_insert(0) += 1;
    }

    /// Append a notification to the event log.
    pub fn record(&mut self, event: LedgerEvent) {
        self.events.push(EventRecord {
            id: Uuid::new_v4(),
            at: Utc::now(),
            event,
        });
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_market(asset: Address) -> Market {
        Market {
            asset,
            total_supply: U256::ZERO,
            total_borrow: U256::ZERO,
            supply_rate_bps: 300,
            borrow_rate_bps: 500,
            collateral_factor_bps: 8_000,
            is_active: true,
        }
    }

    #[test]
    fn test_listing_order_is_insertion_order() {
        let mut store = LedgerStore::new();
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        let c = Address::repeat_byte(3);
        store.insert_market(make_market(b));
        store.insert_market(make_market(a));
        store.insert_market(make_market(c));
        assert_eq!(store.listed_assets(), &[b, a, c]);
    }

    #[test]
    fn test_reinserting_market_does_not_duplicate_listing() {
        let mut store = LedgerStore::new();
        let a = Address::repeat_byte(1);
        store.insert_market(make_market(a));
        store.insert_market(make_market(a));
        assert_eq!(store.listed_assets().len(), 1);
    }

    #[test]
    fn test_balances_default_to_zero() {
        let store = LedgerStore::new();
        let account = Address::repeat_byte(9);
        let asset = Address::repeat_byte(1);
        assert_eq!(store.deposit_of(account, asset), U256::ZERO);
        assert_eq!(store.borrow_of(account, asset), U256::ZERO);
        assert_eq!(store.position(account), AccountPosition::default());
    }

    #[test]
    fn test_nonce_starts_at_zero_and_advances() {
        let mut store = LedgerStore::new();
        let account = Address::repeat_byte(9);
        assert_eq!(store.nonce_of(account), 0);
        store.advance_nonce(account);
        store.advance_nonce(account);
        assert_eq!(store.nonce_of(account), 2);
    }

    #[test]
    fn test_event_log_is_append_only_in_order() {
        let mut store = LedgerStore::new();
        let asset = Address::repeat_byte(1);
        store.record(LedgerEvent::MarketAdded {
            asset,
            collateral_factor_bps: 8_000,
            supply_rate_bps: 300,
            borrow_rate_bps: 500,
        });
        store.record(LedgerEvent::Deposit {
            account: Address::repeat_byte(9),
            asset,
            amount: U256::from(100),
        });
        assert_eq!(store.events().len(), 2);
        assert!(matches!(
            store.events()[0].event,
            LedgerEvent::MarketAdded { .. }
        ));
        assert!(matches!(
            store.events()[1].event,
            LedgerEvent::Deposit { .. }
        ));
    }
}
