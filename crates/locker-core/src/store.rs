//! Persistence interface for actor state.
//!
//! - [`LedgerStore`]: keyed storage for vault and sub-ledger states
//!   (locker-node implements it over RocksDB)
//! - [`MemoryLedgerStore`]: in-memory implementation for tests and tooling

use std::collections::BTreeMap;

use crate::address::SubLedgerKey;
use crate::error::LockerError;
use crate::types::{Address, SubLedgerState, Timestamp, VaultState};

/// Keyed storage for actor states.
///
/// Puts overwrite. Counters track distinct keys ever written.
pub trait LedgerStore: Send + Sync {
    /// Look up a vault. Returns `None` if not deployed.
    fn get_vault(&self, vault: &Address) -> Result<Option<VaultState>, LockerError>;

    /// Write a vault state.
    fn put_vault(&mut self, vault: &Address, state: &VaultState) -> Result<(), LockerError>;

    /// Look up a sub-ledger. Returns `None` while uninitialized.
    fn get_sub_ledger(&self, key: &SubLedgerKey) -> Result<Option<SubLedgerState>, LockerError>;

    /// Write a sub-ledger state.
    fn put_sub_ledger(
        &mut self,
        key: &SubLedgerKey,
        state: &SubLedgerState,
    ) -> Result<(), LockerError>;

    /// All sub-ledgers under one vault, ordered by owner.
    fn sub_ledgers_of(&self, vault: &Address) -> Result<Vec<SubLedgerState>, LockerError>;

    /// Number of deployed vaults.
    fn vault_count(&self) -> Result<u64, LockerError>;

    /// Number of initialized sub-ledgers across all vaults.
    fn sub_ledger_count(&self) -> Result<u64, LockerError>;

    /// Last logical time the host advanced to. 0 on a fresh store.
    fn clock(&self) -> Result<Timestamp, LockerError>;

    /// Persist the logical clock.
    fn set_clock(&mut self, now: Timestamp) -> Result<(), LockerError>;

    /// Whether a vault is deployed at `vault`.
    ///
    /// Default implementation delegates to [`get_vault`](Self::get_vault).
    fn contains_vault(&self, vault: &Address) -> Result<bool, LockerError> {
        Ok(self.get_vault(vault)?.is_some())
    }
}

/// `BTreeMap`-backed store. Not persistent.
#[derive(Debug, Default, Clone)]
pub struct MemoryLedgerStore {
    vaults: BTreeMap<Address, VaultState>,
    sub_ledgers: BTreeMap<(Address, Address), SubLedgerState>,
    clock: Timestamp,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn get_vault(&self, vault: &Address) -> Result<Option<VaultState>, LockerError> {
        Ok(self.vaults.get(vault).cloned())
    }

    fn put_vault(&mut self, vault: &Address, state: &VaultState) -> Result<(), LockerError> {
        self.vaults.insert(*vault, state.clone());
        Ok(())
    }

    fn get_sub_ledger(&self, key: &SubLedgerKey) -> Result<Option<SubLedgerState>, LockerError> {
        Ok(self.sub_ledgers.get(&(key.vault, key.owner)).cloned())
    }

    fn put_sub_ledger(
        &mut self,
        key: &SubLedgerKey,
        state: &SubLedgerState,
    ) -> Result<(), LockerError> {
        self.sub_ledgers
            .insert((key.vault, key.owner), state.clone());
        Ok(())
    }

    fn sub_ledgers_of(&self, vault: &Address) -> Result<Vec<SubLedgerState>, LockerError> {
        Ok(self
            .sub_ledgers
            .range((*vault, Address([0; 32]))..=(*vault, Address([0xFF; 32])))
            .map(|(_, s)| s.clone())
            .collect())
    }

    fn vault_count(&self) -> Result<u64, LockerError> {
        Ok(self.vaults.len() as u64)
    }

    fn sub_ledger_count(&self) -> Result<u64, LockerError> {
        Ok(self.sub_ledgers.len() as u64)
    }

    fn clock(&self) -> Result<Timestamp, LockerError> {
        Ok(self.clock)
    }

    fn set_clock(&mut self, now: Timestamp) -> Result<(), LockerError> {
        self.clock = now;
        Ok(())
    }
}
