//! Access and pause policies.
//!
//! Small injected capabilities rather than inherited behavior: the engine
//! asks them, it does not embed the rules itself.

use alloy::primitives::Address;

use ember_common::error::LedgerError;

/// Gates privileged operations to a single owner identity.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    owner: Address,
}

impl AccessPolicy {
    pub fn new(owner: Address) -> Self {
        Self { owner }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn require_owner(&self, caller: Address) -> Result<(), LedgerError> {
        if caller != self.owner {
            return Err(LedgerError::Unauthorized);
        }
        Ok(())
    }
}

/// Emergency-stop flag checked by every guarded operation handler.
#[derive(Debug, Clone, Default)]
pub struct PausePolicy {
    paused: bool,
}

impl PausePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn unpause(&mut self) {
        self.paused = false;
    }

    pub fn require_unpaused(&self) -> Result<(), LedgerError> {
        if self.paused {
            return Err(LedgerError::ProtocolPaused);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_passes_others_fail() {
        let owner = Address::repeat_byte(0xAA);
        let policy = AccessPolicy::new(owner);
        assert!(policy.require_owner(owner).is_ok());
        assert_eq!(
            policy.require_owner(Address::repeat_byte(0xBB)).unwrap_err(),
            LedgerError::Unauthorized
        );
    }

    #[test]
    fn test_pause_round_trip() {
        let mut policy = PausePolicy::new();
        assert!(policy.require_unpaused().is_ok());
        policy.pause();
        assert_eq!(
            policy.require_unpaused().unwrap_err(),
            LedgerError::ProtocolPaused
        );
        policy.unpause();
        assert!(policy.require_unpaused().is_ok());
    }
}
