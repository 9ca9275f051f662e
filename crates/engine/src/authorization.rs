//! Signed-authorization verifier for the gasless deposit path.
//!
//! The signer commits to a deterministic digest: keccak-256 over the packed
//! operation tag `"deposit"`, asset, amount, nonce, and deadline, signed as
//! an EIP-191 personal message. Verification recovers the signer and
//! requires it to equal the acting account — the submitted account cannot
//! spend anyone else's authorization. Nonces are strict-equality: exactly
//! the account's stored counter, no windowed or out-of-order acceptance.

use alloy::primitives::{Address, B256, Signature, U256, keccak256};

use ember_common::error::LedgerError;

use crate::store::LedgerStore;

/// Operation tag bound into every signed deposit message.
const DEPOSIT_TAG: &[u8] = b"deposit";

/// Off-chain-signed authorization accompanying a gasless deposit.
#[derive(Debug, Clone)]
pub struct SignedAuthorization {
    /// Must equal the account's current stored nonce.
    pub nonce: u64,
    /// Unix timestamp (seconds) after which the authorization is dead.
    pub deadline: u64,
    pub signature: Signature,
}

/// Deterministic digest of a deposit authorization.
pub fn deposit_digest(asset: Address, amount: U256, nonce: u64, deadline: u64) -> B256 {
    let mut message = Vec::with_capacity(DEPOSIT_TAG.len() + 20 + 32 + 32 + 32);
    message.extend_from_slice(DEPOSIT_TAG);
    message.extend_from_slice(asset.as_slice());
    message.extend_from_slice(&amount.to_be_bytes::<32>());
    message.extend_from_slice(&U256::from(nonce).to_be_bytes::<32>());
    message.extend_from_slice(&U256::from(deadline).to_be_bytes::<32>());
    keccak256(&message)
}

/// Check deadline, nonce, and signature for a deposit authorization.
///
/// Read-only: the nonce is advanced by the caller only after the whole
/// deposit has succeeded.
pub fn verify_deposit_authorization(
    store: &LedgerStore,
    account: Address,
    asset: Address,
    amount: U256,
    authorization: &SignedAuthorization,
    now: u64,
) -> Result<(), LedgerError> {
    if now > authorization.deadline {
        return Err(LedgerError::SignatureExpired);
    }

    let expected = store.nonce_of(account);
    if authorization.nonce != expected {
        return Err(LedgerError::InvalidNonce {
            expected,
            got: authorization.nonce,
        });
    }

    let digest = deposit_digest(asset, amount, authorization.nonce, authorization.deadline);
    let signer = authorization
        .signature
        .recover_address_from_msg(digest.as_slice())
        .map_err(|_| LedgerError::InvalidSignature)?;
    if signer == Address::ZERO || signer != account {
        return Err(LedgerError::InvalidSignature);
    }

    Ok(())
}
