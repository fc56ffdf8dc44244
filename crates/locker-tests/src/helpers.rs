//! Shared test helpers for E2E and adversarial tests.

use std::sync::Arc;

use parking_lot::RwLock;

use locker_core::address::SubLedgerKey;
use locker_core::command::Command;
use locker_core::fees::FeeSchedule;
use locker_core::schedule::VestingSchedule;
use locker_core::store::{LedgerStore, MemoryLedgerStore};
use locker_core::types::{Address, Message, SubLedgerState, Timestamp, VaultState};
use locker_node_lib::runtime::{Outcome, Receipt, Runtime};

/// Reference start time of every scenario.
pub const T: Timestamp = 1_685_889_892;

/// Simple account address from a seed byte.
pub fn account(seed: u8) -> Address {
    Address([seed; 32])
}

/// Window closes at `T+100`; ten 60-second steps from `T+1000`.
pub fn default_schedule() -> VestingSchedule {
    VestingSchedule::new(T + 100, T + 1000, 600, 60).unwrap()
}

/// Sum of value credited to `to` across `receipts`.
pub fn paid_to(receipts: &[Receipt], to: &Address) -> u64 {
    receipts
        .iter()
        .filter(|r| r.outcome == Outcome::Credited && r.message.to == *to)
        .map(|r| r.message.value)
        .sum()
}

/// Exit codes of every aborted delivery, in order.
pub fn exit_codes(receipts: &[Receipt]) -> Vec<u32> {
    receipts.iter().filter_map(Receipt::exit_code).collect()
}

/// A runtime over an in-memory store with one vault deployed.
pub struct Harness {
    pub runtime: Runtime<MemoryLedgerStore>,
    pub vault: Address,
}

impl Harness {
    /// Default fees, default schedule, clock at `T`.
    pub fn new() -> Self {
        Self::with_fees(FeeSchedule::default())
    }

    pub fn with_fees(fees: FeeSchedule) -> Self {
        let store = Arc::new(RwLock::new(MemoryLedgerStore::new()));
        let mut runtime = Runtime::new(store, fees);
        runtime.advance_clock(T).unwrap();
        let vault = runtime
            .deploy(VaultState::new(default_schedule()))
            .unwrap();
        Self { runtime, vault }
    }

    /// Send `cmd` from `from` to the vault at `now`.
    pub fn send(&mut self, from: Address, value: u64, cmd: Command, now: Timestamp) -> Vec<Receipt> {
        self.send_raw(Message::new(from, self.vault, value, cmd.encode()), now)
    }

    /// Deliver an arbitrary message at `now`.
    pub fn send_raw(&mut self, msg: Message, now: Timestamp) -> Vec<Receipt> {
        self.runtime.send(msg, now).unwrap()
    }

    pub fn deposit(&mut self, from: Address, value: u64, now: Timestamp) -> Vec<Receipt> {
        self.send(from, value, Command::Deposit, now)
    }

    pub fn reward(&mut self, from: Address, value: u64, now: Timestamp) -> Vec<Receipt> {
        self.send(from, value, Command::Reward, now)
    }

    pub fn withdraw(&mut self, from: Address, gas: u64, now: Timestamp) -> Vec<Receipt> {
        self.send(from, gas, Command::WithdrawRequest, now)
    }

    pub fn vault_state(&self) -> VaultState {
        self.runtime
            .store()
            .read()
            .get_vault(&self.vault)
            .unwrap()
            .unwrap()
    }

    pub fn sub_ledger(&self, owner: &Address) -> Option<SubLedgerState> {
        self.runtime
            .store()
            .read()
            .get_sub_ledger(&SubLedgerKey::new(self.vault, *owner))
            .unwrap()
    }

    /// Deterministic sub-ledger address of `owner`.
    pub fn sub_ledger_address(&self, owner: &Address) -> Address {
        let state = self.vault_state();
        locker_core::address::derive_sub_ledger_address(
            &self.vault,
            owner,
            &state.sub_ledger_template,
        )
    }

    /// Write a sub-ledger directly, bypassing the protocol.
    pub fn seed_sub_ledger(&self, state: &SubLedgerState) {
        self.runtime
            .store()
            .write()
            .put_sub_ledger(&SubLedgerKey::new(state.vault, state.owner), state)
            .unwrap();
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
