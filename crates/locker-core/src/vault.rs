//! Vault actor: pool totals, deposit window, withdrawal settlement.
//!
//! Handlers are pure. They take the current state by reference and return a
//! [`Transition`] holding the next state and outbound messages, or the abort
//! code. The host commits the state before dispatching anything.

use crate::address::derive_sub_ledger_address;
use crate::command::{ActorKind, Command};
use crate::entitlement::{self, PoolTotals};
use crate::error::ProtocolError;
use crate::fees::FeeSchedule;
use crate::types::{Address, Message, SubLedgerInit, Timestamp, Transition, VaultState};

/// A vault bound to its address and fee schedule.
#[derive(Clone, Copy, Debug)]
pub struct Vault {
    pub address: Address,
    pub fees: FeeSchedule,
}

impl Vault {
    pub fn new(address: Address, fees: FeeSchedule) -> Self {
        Self { address, fees }
    }

    /// Address of `owner`'s sub-ledger under this vault.
    pub fn sub_ledger_of(&self, state: &VaultState, owner: &Address) -> Address {
        derive_sub_ledger_address(&self.address, owner, &state.sub_ledger_template)
    }

    /// Process one inbound message at logical time `now`.
    pub fn handle(
        &self,
        state: &VaultState,
        msg: &Message,
        now: Timestamp,
    ) -> Result<Transition<VaultState>, ProtocolError> {
        match Command::decode(&msg.body, ActorKind::Vault)? {
            Command::Reward => self.on_reward(state, msg, now),
            Command::Deposit => self.on_deposit(state, msg, now),
            Command::WithdrawRequest => self.on_withdraw_request(state, msg, now),
            Command::WithdrawSettlement {
                owner,
                total_user_deposit,
                last_withdraw,
                now: reported_now,
            } => self.on_settlement(state, msg, owner, total_user_deposit, last_withdraw, reported_now),
            // decode never yields sub-ledger commands for a vault
            Command::DepositForward { .. } | Command::WithdrawQuery => Err(
                ProtocolError::MalformedMessage("sub-ledger command at vault".into()),
            ),
        }
    }

    fn check_window(state: &VaultState, now: Timestamp) -> Result<(), ProtocolError> {
        if !state.schedule.deposits_open(now) {
            return Err(ProtocolError::DepositsClosed {
                now,
                window_end: state.schedule.deposit_window_end,
            });
        }
        Ok(())
    }

    fn on_reward(
        &self,
        state: &VaultState,
        msg: &Message,
        now: Timestamp,
    ) -> Result<Transition<VaultState>, ProtocolError> {
        Self::check_window(state, now)?;
        let net = self.fees.net_reward(msg.value)?;
        let mut next = state.clone();
        next.total_reward = next
            .total_reward
            .checked_add(net)
            .ok_or(ProtocolError::ArithmeticOverflow)?;
        Ok(Transition::quiet(next))
    }

    fn on_deposit(
        &self,
        state: &VaultState,
        msg: &Message,
        now: Timestamp,
    ) -> Result<Transition<VaultState>, ProtocolError> {
        Self::check_window(state, now)?;
        let net = self.fees.net_deposit(msg.value)?;
        let mut next = state.clone();
        next.total_locked = next
            .total_locked
            .checked_add(net)
            .ok_or(ProtocolError::ArithmeticOverflow)?;

        let forward = Message::new(
            self.address,
            self.sub_ledger_of(state, &msg.from),
            0,
            Command::DepositForward { amount: net }.encode(),
        )
        .with_init(SubLedgerInit {
            vault: self.address,
            owner: msg.from,
        });
        Ok(Transition::send(next, forward))
    }

    fn on_withdraw_request(
        &self,
        state: &VaultState,
        msg: &Message,
        now: Timestamp,
    ) -> Result<Transition<VaultState>, ProtocolError> {
        let gas = self.fees.check_withdraw_gas(msg.value)?;
        let available_at = state.schedule.withdraw_available_at();
        if now < available_at {
            return Err(ProtocolError::WithdrawNotYetAvailable { now, available_at });
        }
        let query = Message::new(
            self.address,
            self.sub_ledger_of(state, &msg.from),
            gas,
            Command::WithdrawQuery.encode(),
        )
        .with_init(SubLedgerInit {
            vault: self.address,
            owner: msg.from,
        });
        Ok(Transition::send(state.clone(), query))
    }

    fn on_settlement(
        &self,
        state: &VaultState,
        msg: &Message,
        owner: Address,
        deposit: u64,
        last: Timestamp,
        reported_now: Timestamp,
    ) -> Result<Transition<VaultState>, ProtocolError> {
        let expected = self.sub_ledger_of(state, &owner);
        if msg.from != expected {
            return Err(ProtocolError::InvalidSubLedgerSender {
                sender: msg.from,
                expected,
            });
        }
        let amount = entitlement::withdraw_amount(
            &state.schedule,
            PoolTotals::from(state),
            reported_now,
            last,
            deposit,
        );
        let payout = amount
            .checked_add(msg.value)
            .ok_or(ProtocolError::ArithmeticOverflow)?;
        let transfer = Message::new(self.address, owner, payout, Vec::new());
        Ok(Transition::send(state.clone(), transfer))
    }
}
