//! Operation handlers over the ledger store.
//!
//! `LendingEngine` owns the store, the injected policies, and the external
//! transfer collaborator. Every mutating entry point follows the same
//! shape:
//!
//! 1. Gate checks (pause, ownership) and preconditions
//! 2. Stage: every balance the operation will write, computed with checked
//!    arithmetic against the current state
//! 3. External transfer leg(s)
//! 4. Commit the staged balances and append the notification
//!
//! Because nothing is written before the transfer legs and the commit
//! cannot fail, a rejected precondition or a failed transfer leaves the
//! ledger byte-for-byte unchanged — operations are all-or-nothing. The
//! collaborator is owned by the engine and every entry point takes
//! `&mut self`, so a transfer hook cannot reenter a guarded operation
//! mid-flight.

use alloy::primitives::{Address, U256};
use chrono::Utc;

use ember_common::error::LedgerError;
use ember_common::types::{AccountPosition, EventRecord, LedgerEvent, Market};

use crate::authorization::{self, SignedAuthorization};
use crate::collateral;
use crate::liquidation;
use crate::policy::{AccessPolicy, PausePolicy};
use crate::registry;
use crate::store::LedgerStore;
use crate::transfer::AssetTransfer;

fn checked_add(a: U256, b: U256) -> Result<U256, LedgerError> {
    a.checked_add(b).ok_or(LedgerError::ArithmeticOverflow)
}

fn checked_sub(a: U256, b: U256) -> Result<U256, LedgerError> {
    a.checked_sub(b).ok_or(LedgerError::ArithmeticOverflow)
}

fn require_positive(amount: U256) -> Result<(), LedgerError> {
    if amount.is_zero() {
        return Err(LedgerError::InvalidAmount);
    }
    Ok(())
}

pub struct LendingEngine {
    store: LedgerStore,
    access: AccessPolicy,
    pause: PausePolicy,
    transfer: Box<dyn AssetTransfer + Send + Sync>,
}

impl LendingEngine {
    pub fn new(owner: Address, transfer: Box<dyn AssetTransfer + Send + Sync>) -> Self {
        Self {
            store: LedgerStore::new(),
            access: AccessPolicy::new(owner),
            pause: PausePolicy::new(),
            transfer,
        }
    }

    fn active_market(&self, asset: Address) -> Result<&Market, LedgerError> {
        self.store
            .market(asset)
            .filter(|market| market.is_active)
            .ok_or(LedgerError::MarketInactive(asset))
    }

    // ------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------

    /// List a new market. Owner only.
    pub fn add_market(
        &mut self,
        caller: Address,
        asset: Address,
        collateral_factor_bps: u64,
        supply_rate_bps: u64,
        borrow_rate_bps: u64,
    ) -> Result<(), LedgerError> {
        self.access.require_owner(caller)?;
        registry::add_market(
            &mut self.store,
            asset,
            collateral_factor_bps,
            supply_rate_bps,
            borrow_rate_bps,
        )
    }

    /// Update an active market's risk and rate parameters. Owner only.
    pub fn update_market(
        &mut self,
        caller: Address,
        asset: Address,
        collateral_factor_bps: u64,
        supply_rate_bps: u64,
        borrow_rate_bps: u64,
    ) -> Result<(), LedgerError> {
        self.access.require_owner(caller)?;
        registry::update_market(
            &mut self.store,
            asset,
            collateral_factor_bps,
            supply_rate_bps,
            borrow_rate_bps,
        )
    }

    /// Halt all guarded operations. Owner only.
    pub fn pause(&mut self, caller: Address) -> Result<(), LedgerError> {
        self.access.require_owner(caller)?;
        self.pause.pause();
        tracing::warn!(%caller, "protocol paused");
        Ok(())
    }

    /// Resume guarded operations. Owner only.
    pub fn unpause(&mut self, caller: Address) -> Result<(), LedgerError> {
        self.access.require_owner(caller)?;
        self.pause.unpause();
        tracing::info!(%caller, "protocol unpaused");
        Ok(())
    }

    /// Emergency raw push of custody funds, bypassing the ledger. Owner
    /// only; account balances are deliberately not touched.
    pub fn recover_asset(
        &mut self,
        caller: Address,
        asset: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        self.access.require_owner(caller)?;
        self.transfer.push(asset, to, amount)?;
        tracing::warn!(%asset, %to, %amount, "custody funds recovered by owner");
        Ok(())
    }

    // ------------------------------------------------------------
    // Position operations
    // ------------------------------------------------------------

    /// Deposit `amount` of `asset` as collateral, pulling it from the
    /// caller's external balance.
    pub fn deposit(
        &mut self,
        caller: Address,
        asset: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        self.pause.require_unpaused()?;
        self.deposit_inner(caller, asset, amount)
    }

    fn deposit_inner(
        &mut self,
        account: Address,
        asset: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        let market = self.active_market(asset)?;
        require_positive(amount)?;

        let staged_supply = checked_add(market.total_supply, amount)?;
        let staged_deposit = checked_add(self.store.deposit_of(account, asset), amount)?;
        let staged_total = checked_add(self.store.position(account).total_deposited, amount)?;

        self.transfer.pull(asset, account, amount)?;

        self.store.set_deposit(account, asset, staged_deposit);
        let position = self.store.position_mut(account);
        position.total_deposited = staged_total;
        position.last_update = Utc::now();
        position.is_active = true;
        self.store
            .market_mut(asset)
            .ok_or(LedgerError::MarketInactive(asset))?
            .total_supply = staged_supply;
        self.store.record(LedgerEvent::Deposit {
            account,
            asset,
            amount,
        });

        tracing::info!(%account, %asset, %amount, "deposit credited");
        Ok(())
    }

    /// Withdraw `amount` of previously deposited `asset`, provided the
    /// position stays safe without it.
    pub fn withdraw(
        &mut self,
        caller: Address,
        asset: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        self.pause.require_unpaused()?;
        let market = self.active_market(asset)?;
        require_positive(amount)?;

        let deposited = self.store.deposit_of(caller, asset);
        if deposited < amount {
            return Err(LedgerError::InsufficientDeposit);
        }
        if !collateral::can_withdraw(&self.store, caller, asset, amount)? {
            return Err(LedgerError::UnsafeWithdrawal);
        }

        let staged_supply = checked_sub(market.total_supply, amount)?;
        let staged_deposit = checked_sub(deposited, amount)?;
        let staged_total = checked_sub(self.store.position(caller).total_deposited, amount)?;

        self.transfer.push(asset, caller, amount)?;

        self.store.set_deposit(caller, asset, staged_deposit);
        let position = self.store.position_mut(caller);
        position.total_deposited = staged_total;
        position.last_update = Utc::now();
        if staged_total.is_zero() {
            position.is_active = false;
        }
        self.store
            .market_mut(asset)
            .ok_or(LedgerError::MarketInactive(asset))?
            .total_supply = staged_supply;
        self.store.record(LedgerEvent::Withdraw {
            account: caller,
            asset,
            amount,
        });

        tracing::info!(%caller, %asset, %amount, "withdrawal paid out");
        Ok(())
    }

    /// Borrow `amount` of `asset` against the caller's collateral.
    pub fn borrow(
        &mut self,
        caller: Address,
        asset: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        self.pause.require_unpaused()?;
        let market = self.active_market(asset)?;
        require_positive(amount)?;

        if market.total_supply < amount {
            return Err(LedgerError::InsufficientLiquidity);
        }
        if !collateral::can_borrow(&self.store, caller, asset, amount)? {
            return Err(LedgerError::UnsafeBorrow);
        }

        let staged_market_borrow = checked_add(market.total_borrow, amount)?;
        let staged_borrow = checked_add(self.store.borrow_of(caller, asset), amount)?;
        let staged_total = checked_add(self.store.position(caller).total_borrowed, amount)?;

        self.transfer.push(asset, caller, amount)?;

        self.store.set_borrow(caller, asset, staged_borrow);
        let position = self.store.position_mut(caller);
        position.total_borrowed = staged_total;
        position.last_update = Utc::now();
        position.is_active = true;
        self.store
            .market_mut(asset)
            .ok_or(LedgerError::MarketInactive(asset))?
            .total_borrow = staged_market_borrow;
        self.store.record(LedgerEvent::Borrow {
            account: caller,
            asset,
            amount,
        });

        tracing::info!(%caller, %asset, %amount, "borrow paid out");
        Ok(())
    }

    /// Repay `amount` of the caller's outstanding borrow in `asset`.
    pub fn repay(
        &mut self,
        caller: Address,
        asset: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        self.pause.require_unpaused()?;
        let market = self.active_market(asset)?;
        require_positive(amount)?;

        let borrowed = self.store.borrow_of(caller, asset);
        if borrowed < amount {
            return Err(LedgerError::InsufficientBorrow);
        }

        let staged_market_borrow = checked_sub(market.total_borrow, amount)?;
        let staged_borrow = checked_sub(borrowed, amount)?;
        let staged_total = checked_sub(self.store.position(caller).total_borrowed, amount)?;

        self.transfer.pull(asset, caller, amount)?;

        self.store.set_borrow(caller, asset, staged_borrow);
        let position = self.store.position_mut(caller);
        position.total_borrowed = staged_total;
        position.last_update = Utc::now();
        if staged_total.is_zero() && position.total_deposited.is_zero() {
            position.is_active = false;
        }
        self.store
            .market_mut(asset)
            .ok_or(LedgerError::MarketInactive(asset))?
            .total_borrow = staged_market_borrow;
        self.store.record(LedgerEvent::Repay {
            account: caller,
            asset,
            amount,
        });

        tracing::info!(%caller, %asset, %amount, "repayment credited");
        Ok(())
    }

    /// Repay `amount` of `account`'s debt in `asset` and seize the
    /// penalty-boosted equivalent from its best collateral asset.
    pub fn liquidate(
        &mut self,
        liquidator: Address,
        account: Address,
        asset: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        self.pause.require_unpaused()?;
        require_positive(amount)?;

        let borrowed = self.store.borrow_of(account, asset);
        if borrowed < amount {
            return Err(LedgerError::InsufficientBorrowToLiquidate);
        }
        if !collateral::is_liquidatable(&self.store, account)? {
            return Err(LedgerError::NotLiquidatable);
        }

        let seized = liquidation::seize_amount(amount)?;
        let collateral_asset = liquidation::select_best_collateral(&self.store, account)?
            .ok_or(LedgerError::NoCollateral)?;
        let collateral_deposit = self.store.deposit_of(account, collateral_asset);
        if collateral_deposit < seized {
            return Err(LedgerError::InsufficientCollateral);
        }

        let position = self.store.position(account);
        let staged_borrow = checked_sub(borrowed, amount)?;
        let staged_total_borrowed = checked_sub(position.total_borrowed, amount)?;
        let staged_debt_market_borrow = checked_sub(
            self.store
                .market(asset)
                .ok_or(LedgerError::MarketInactive(asset))?
                .total_borrow,
            amount,
        )?;
        let staged_collateral_deposit = checked_sub(collateral_deposit, seized)?;
        let staged_total_deposited = checked_sub(position.total_deposited, seized)?;
        let staged_collateral_supply = checked_sub(
            self.store
                .market(collateral_asset)
                .ok_or(LedgerError::MarketInactive(collateral_asset))?
                .total_supply,
            seized,
        )?;

        self.transfer.pull(asset, liquidator, amount)?;
        if let Err(error) = self.transfer.push(collateral_asset, liquidator, seized) {
            // hand the repayment back; custody must not keep it when the
            // exchange did not complete
            if let Err(refund_error) = self.transfer.push(asset, liquidator, amount) {
                tracing::error!(
                    %liquidator,
                    %asset,
                    %amount,
                    error = %refund_error,
                    "refund after failed collateral payout also failed"
                );
            }
            return Err(error.into());
        }

        self.store.set_borrow(account, asset, staged_borrow);
        self.store
            .set_deposit(account, collateral_asset, staged_collateral_deposit);
        let position = self.store.position_mut(account);
        position.total_borrowed = staged_total_borrowed;
        position.total_deposited = staged_total_deposited;
        self.store
            .market_mut(asset)
            .ok_or(LedgerError::MarketInactive(asset))?
            .total_borrow = staged_debt_market_borrow;
        self.store
            .market_mut(collateral_asset)
            .ok_or(LedgerError::MarketInactive(collateral_asset))?
            .total_supply = staged_collateral_supply;
        self.store.record(LedgerEvent::Liquidate {
            liquidator,
            account,
            debt_asset: asset,
            repaid: amount,
            collateral_asset,
            seized,
        });

        tracing::warn!(
            %liquidator,
            %account,
            debt_asset = %asset,
            repaid = %amount,
            collateral_asset = %collateral_asset,
            %seized,
            "position liquidated"
        );
        Ok(())
    }

    /// Deposit on behalf of `account`, authorized by an off-chain signature
    /// instead of direct caller authentication. The nonce advances only
    /// when the entire operation has succeeded, so a failed attempt never
    /// burns it.
    pub fn deposit_with_signature(
        &mut self,
        account: Address,
        asset: Address,
        amount: U256,
        authorization: &SignedAuthorization,
    ) -> Result<(), LedgerError> {
        self.pause.require_unpaused()?;

        let now = Utc::now().timestamp().max(0) as u64;
        authorization::verify_deposit_authorization(
            &self.store,
            account,
            asset,
            amount,
            authorization,
            now,
        )?;

        self.deposit_inner(account, asset, amount)?;
        self.store.advance_nonce(account);

        tracing::info!(
            %account,
            %asset,
            %amount,
            next_nonce = self.store.nonce_of(account),
            "signed deposit accepted"
        );
        Ok(())
    }

    // ------------------------------------------------------------
    // Read-only queries
    // ------------------------------------------------------------

    pub fn collateralization_ratio(&self, account: Address) -> Result<U256, LedgerError> {
        collateral::collateralization_ratio(&self.store, account)
    }

    pub fn can_withdraw(
        &self,
        account: Address,
        asset: Address,
        amount: U256,
    ) -> Result<bool, LedgerError> {
        collateral::can_withdraw(&self.store, account, asset, amount)
    }

    pub fn can_borrow(
        &self,
        account: Address,
        asset: Address,
        amount: U256,
    ) -> Result<bool, LedgerError> {
        collateral::can_borrow(&self.store, account, asset, amount)
    }

    pub fn is_liquidatable(&self, account: Address) -> Result<bool, LedgerError> {
        collateral::is_liquidatable(&self.store, account)
    }

    pub fn market(&self, asset: Address) -> Option<Market> {
        self.store.market(asset).cloned()
    }

    /// All markets in listing order.
    pub fn markets(&self) -> Vec<Market> {
        self.store
            .listed_assets()
            .iter()
            .filter_map(|asset| self.store.market(*asset))
            .cloned()
            .collect()
    }

    pub fn listed_assets(&self) -> Vec<Address> {
        self.store.listed_assets().to_vec()
    }

    pub fn account(&self, account: Address) -> AccountPosition {
        self.store.position(account)
    }

    pub fn deposit_balance(&self, account: Address, asset: Address) -> U256 {
        self.store.deposit_of(account, asset)
    }

    pub fn borrow_balance(&self, account: Address, asset: Address) -> U256 {
        self.store.borrow_of(account, asset)
    }

    pub fn nonce(&self, account: Address) -> u64 {
        self.store.nonce_of(account)
    }

    pub fn events(&self) -> &[EventRecord] {
        self.store.events()
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    pub fn owner(&self) -> Address {
        self.access.owner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::InMemoryBank;

    fn owner() -> Address {
        Address::repeat_byte(0xAA)
    }

    fn setup() -> (LendingEngine, InMemoryBank) {
        let bank = InMemoryBank::new();
        let engine = LendingEngine::new(owner(), Box::new(bank.clone()));
        (engine, bank)
    }

    #[test]
    fn test_admin_operations_gated_to_owner() {
        let (mut engine, _bank) = setup();
        let outsider = Address::repeat_byte(0x01);
        let asset = Address::repeat_byte(0x02);
        assert_eq!(
            engine.add_market(outsider, asset, 8_000, 0, 0).unwrap_err(),
            LedgerError::Unauthorized
        );
        assert_eq!(engine.pause(outsider).unwrap_err(), LedgerError::Unauthorized);
        engine.add_market(owner(), asset, 8_000, 0, 0).unwrap();
        engine.pause(owner()).unwrap();
        assert!(engine.is_paused());
    }

    #[test]
    fn test_pause_blocks_guarded_operations() {
        let (mut engine, bank) = setup();
        let user = Address::repeat_byte(0x01);
        let asset = Address::repeat_byte(0x02);
        engine.add_market(owner(), asset, 8_000, 0, 0).unwrap();
        bank.mint(asset, user, U256::from(100));

        engine.pause(owner()).unwrap();
        for result in [
            engine.deposit(user, asset, U256::from(1)),
            engine.withdraw(user, asset, U256::from(1)),
            engine.borrow(user, asset, U256::from(1)),
            engine.repay(user, asset, U256::from(1)),
            engine.liquidate(user, user, asset, U256::from(1)),
        ] {
            assert_eq!(result.unwrap_err(), LedgerError::ProtocolPaused);
        }

        engine.unpause(owner()).unwrap();
        engine.deposit(user, asset, U256::from(1)).unwrap();
    }

    #[test]
    fn test_recover_asset_bypasses_ledger() {
        let (mut engine, bank) = setup();
        let user = Address::repeat_byte(0x01);
        let asset = Address::repeat_byte(0x02);
        engine.add_market(owner(), asset, 8_000, 0, 0).unwrap();
        bank.mint(asset, user, U256::from(500));
        engine.deposit(user, asset, U256::from(500)).unwrap();

        let sink = Address::repeat_byte(0x03);
        engine
            .recover_asset(owner(), asset, sink, U256::from(200))
            .unwrap();

        assert_eq!(bank.balance_of(asset, sink), U256::from(200));
        assert_eq!(bank.custody_of(asset), U256::from(300));
        // ledger still claims the full deposit
        assert_eq!(engine.deposit_balance(user, asset), U256::from(500));
    }
}
