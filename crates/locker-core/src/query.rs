//! Read-only queries over a [`LedgerStore`].
//!
//! None of these mutate state. Vault-scoped queries fail with
//! [`LockerError::UnknownVault`] when nothing is deployed at the address.

use crate::address::{derive_sub_ledger_address, SubLedgerKey};
use crate::entitlement::{self, PoolTotals};
use crate::error::LockerError;
use crate::store::LedgerStore;
use crate::types::{Address, SubLedgerState, Timestamp, VaultSnapshot, VaultState};

fn load_vault<S: LedgerStore + ?Sized>(store: &S, vault: &Address) -> Result<VaultState, LockerError> {
    store
        .get_vault(vault)?
        .ok_or(LockerError::UnknownVault(*vault))
}

/// Totals and schedule of a vault.
pub fn vault_state<S: LedgerStore + ?Sized>(
    store: &S,
    vault: &Address,
) -> Result<VaultSnapshot, LockerError> {
    Ok(load_vault(store, vault)?.snapshot())
}

/// Deterministic address of `owner`'s sub-ledger, whether or not it exists yet.
pub fn sub_ledger_address<S: LedgerStore + ?Sized>(
    store: &S,
    vault: &Address,
    owner: &Address,
) -> Result<Address, LockerError> {
    let state = load_vault(store, vault)?;
    Ok(derive_sub_ledger_address(vault, owner, &state.sub_ledger_template))
}

/// Portion of `amount` the vault's curve has unlocked at `t`.
pub fn unlocked_amount<S: LedgerStore + ?Sized>(
    store: &S,
    vault: &Address,
    t: Timestamp,
    amount: u64,
) -> Result<u64, LockerError> {
    Ok(load_vault(store, vault)?.schedule.unlocked_of(amount, t))
}

/// Stored sub-ledger figures, `None` while uninitialized.
pub fn sub_ledger_state<S: LedgerStore + ?Sized>(
    store: &S,
    vault: &Address,
    owner: &Address,
) -> Result<Option<SubLedgerState>, LockerError> {
    load_vault(store, vault)?;
    store.get_sub_ledger(&SubLedgerKey::new(*vault, *owner))
}

/// What a settlement reporting `(now, last, deposit)` would pay against the
/// current pool totals, excluding returned gas.
pub fn amount_to_withdraw<S: LedgerStore + ?Sized>(
    store: &S,
    vault: &Address,
    now: Timestamp,
    last: Timestamp,
    deposit: u64,
) -> Result<u64, LockerError> {
    let state = load_vault(store, vault)?;
    Ok(entitlement::withdraw_amount(
        &state.schedule,
        PoolTotals::from(&state),
        now,
        last,
        deposit,
    ))
}
