//! Deterministic actor addressing.
//!
//! A sub-ledger's address is a pure function of `(vault, owner, template)`,
//! so any party can compute it without a registry. The vault uses the same
//! derivation to route deposits and to authenticate settlement senders.

use crate::constants::{SUB_LEDGER_CODE_ID, SUB_LEDGER_DOMAIN, VAULT_DOMAIN};
use crate::types::{Address, Hash256, VaultState};

/// Template hash of the current sub-ledger code.
pub fn default_sub_ledger_template() -> Hash256 {
    Hash256(blake3::hash(SUB_LEDGER_CODE_ID).into())
}

/// Address of the sub-ledger for `owner` under `vault`.
pub fn derive_sub_ledger_address(vault: &Address, owner: &Address, template: &Hash256) -> Address {
    let mut hasher = blake3::Hasher::new_derive_key(SUB_LEDGER_DOMAIN);
    hasher.update(template.as_bytes());
    hasher.update(vault.as_bytes());
    hasher.update(owner.as_bytes());
    Address(hasher.finalize().into())
}

/// Address a vault is deployed at, derived from its initial state.
///
/// Two vaults with identical parameters collide; deployers vary the schedule
/// or template to get a fresh address.
pub fn vault_address(state: &VaultState) -> Address {
    let s = &state.schedule;
    let mut hasher = blake3::Hasher::new_derive_key(VAULT_DOMAIN);
    hasher.update(state.sub_ledger_template.as_bytes());
    hasher.update(&state.total_locked.to_le_bytes());
    hasher.update(&state.total_reward.to_le_bytes());
    hasher.update(&s.deposit_window_end.to_le_bytes());
    hasher.update(&s.vesting_start.to_le_bytes());
    hasher.update(&s.vesting_duration.to_le_bytes());
    hasher.update(&s.unlock_period.to_le_bytes());
    Address(hasher.finalize().into())
}

/// Storage key of a sub-ledger: `vault ‖ owner`.
///
/// The vault prefix groups all sub-ledgers of one vault together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubLedgerKey {
    pub vault: Address,
    pub owner: Address,
}

impl SubLedgerKey {
    pub fn new(vault: Address, owner: Address) -> Self {
        Self { vault, owner }
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(self.vault.as_bytes());
        buf[32..].copy_from_slice(self.owner.as_bytes());
        buf
    }

    /// Parse a 64-byte key. Returns `None` on any other length.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 64 {
            return None;
        }
        let vault: [u8; 32] = bytes[..32].try_into().ok()?;
        let owner: [u8; 32] = bytes[32..].try_into().ok()?;
        Some(Self::new(Address(vault), Address(owner)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::VestingSchedule;

    fn vault_state() -> VaultState {
        VaultState::new(VestingSchedule::new(100, 1000, 600, 60).unwrap())
    }

    #[test]
    fn sub_ledger_address_is_deterministic() {
        let t = default_sub_ledger_template();
        let v = Address([1; 32]);
        let o = Address([2; 32]);
        assert_eq!(
            derive_sub_ledger_address(&v, &o, &t),
            derive_sub_ledger_address(&v, &o, &t)
        );
    }

    #[test]
    fn sub_ledger_address_depends_on_every_input() {
        let t = default_sub_ledger_template();
        let v = Address([1; 32]);
        let o = Address([2; 32]);
        let base = derive_sub_ledger_address(&v, &o, &t);
        assert_ne!(base, derive_sub_ledger_address(&Address([3; 32]), &o, &t));
        assert_ne!(base, derive_sub_ledger_address(&v, &Address([3; 32]), &t));
        assert_ne!(base, derive_sub_ledger_address(&v, &o, &Hash256([9; 32])));
        // Swapping roles must not collide.
        assert_ne!(base, derive_sub_ledger_address(&o, &v, &t));
    }

    #[test]
    fn vault_address_tracks_parameters() {
        let a = vault_state();
        let mut b = vault_state();
        assert_eq!(vault_address(&a), vault_address(&b));
        b.schedule.vesting_start += 1;
        assert_ne!(vault_address(&a), vault_address(&b));
    }

    #[test]
    fn vault_and_sub_ledger_domains_differ() {
        let state = vault_state();
        let vault = vault_address(&state);
        assert_ne!(
            vault,
            derive_sub_ledger_address(&vault, &vault, &state.sub_ledger_template)
        );
    }

    #[test]
    fn key_layout() {
        let key = SubLedgerKey::new(Address([0xAA; 32]), Address([0xBB; 32]));
        let bytes = key.to_bytes();
        assert_eq!(&bytes[..32], &[0xAA; 32]);
        assert_eq!(&bytes[32..], &[0xBB; 32]);
        assert_eq!(SubLedgerKey::from_bytes(&bytes), Some(key));
        assert_eq!(SubLedgerKey::from_bytes(&bytes[..10]), None);
    }
}
