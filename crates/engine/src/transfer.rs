//! External asset-transfer collaborator.
//!
//! The ledger never moves tokens itself; it asks this capability to pull
//! funds into custody or push them back out. Both legs fail loudly — a
//! short transfer is not a success.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy::primitives::{Address, U256};

use ember_common::error::TransferError;

/// Custody interface over external token balances.
pub trait AssetTransfer {
    /// Move `amount` of `asset` from `from`'s external balance into custody.
    fn pull(&mut self, asset: Address, from: Address, amount: U256) -> Result<(), TransferError>;

    /// Move `amount` of `asset` out of custody to `to`.
    fn push(&mut self, asset: Address, to: Address, amount: U256) -> Result<(), TransferError>;
}

#[derive(Debug, Default)]
struct BankState {
    /// (asset, holder) → external balance
    balances: HashMap<(Address, Address), U256>,
    /// asset → amount held in custody
    custody: HashMap<Address, U256>,
}

/// In-memory token bank backing the single-process simulator.
///
/// Clones share state, so a test or binary can keep a handle for minting
/// and inspection while the engine owns its own copy as the collaborator.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBank {
    inner: Arc<Mutex<BankState>>,
}

impl InMemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BankState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Credit `amount` of `asset` to `holder`'s external balance.
    pub fn mint(&self, asset: Address, holder: Address, amount: U256) {
        let mut state = self.state();
        let balance = state.balances.entry((asset, holder)).or_insert(U256::ZERO);
        *balance = balance.saturating_add(amount);
    }

    pub fn balance_of(&self, asset: Address, holder: Address) -> U256 {
        self.state()
            .balances
            .get(&(asset, holder))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    pub fn custody_of(&self, asset: Address) -> U256 {
        self.state().custody.get(&asset).copied().unwrap_or(U256::ZERO)
    }
}

impl AssetTransfer for InMemoryBank {
    fn pull(&mut self, asset: Address, from: Address, amount: U256) -> Result<(), TransferError> {
        let mut state = self.state();
        let balance = state
            .balances
            .get(&(asset, from))
            .copied()
            .unwrap_or(U256::ZERO);
        if balance < amount {
            return Err(TransferError::InsufficientBalance);
        }
        state.balances.insert((asset, from), balance - amount);
        let custody = state.custody.entry(asset).or_insert(U256::ZERO);
        *custody = custody
            .checked_add(amount)
            .ok_or_else(|| TransferError::Other("custody balance overflow".to_string()))?;
        Ok(())
    }

    fn push(&mut self, asset: Address, to: Address, amount: U256) -> Result<(), TransferError> {
        let mut state = self.state();
        let custody = state.custody.get(&asset).copied().unwrap_or(U256::ZERO);
        if custody < amount {
            return Err(TransferError::InsufficientBalance);
        }
        state.custody.insert(asset, custody - amount);
        let balance = state.balances.entry((asset, to)).or_insert(U256::ZERO);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| TransferError::Other("holder balance overflow".to_string()))?;
        Ok(())
    }
}
