//! Sub-ledger actor: one depositor's principal and withdraw cursor.
//!
//! A sub-ledger only ever talks to its vault. It is created by the first
//! deposit-forward and never destroyed. On a withdraw query it reports its raw
//! figures and advances `last_withdraw` in the same step, so two overlapping
//! queries cannot both claim the same interval.

use crate::command::{ActorKind, Command};
use crate::error::ProtocolError;
use crate::fees::FeeSchedule;
use crate::types::{Address, Message, SubLedgerInit, SubLedgerState, Timestamp, Transition};

/// A sub-ledger bound to its address and identity.
#[derive(Clone, Copy, Debug)]
pub struct SubLedger {
    pub address: Address,
    pub vault: Address,
    pub owner: Address,
    pub fees: FeeSchedule,
}

impl SubLedger {
    pub fn new(address: Address, init: SubLedgerInit, fees: FeeSchedule) -> Self {
        Self {
            address,
            vault: init.vault,
            owner: init.owner,
            fees,
        }
    }

    /// Process one inbound message. `state` is `None` until the first
    /// deposit-forward is committed.
    pub fn handle(
        &self,
        state: Option<&SubLedgerState>,
        msg: &Message,
        now: Timestamp,
    ) -> Result<Transition<SubLedgerState>, ProtocolError> {
        let cmd = Command::decode(&msg.body, ActorKind::SubLedger)?;
        if msg.from != self.vault {
            return Err(ProtocolError::InvalidVaultSender {
                sender: msg.from,
                expected: self.vault,
            });
        }
        match cmd {
            Command::DepositForward { amount } => {
                let mut next = state
                    .cloned()
                    .unwrap_or_else(|| SubLedgerState::new(self.vault, self.owner));
                next.total_deposited = next
                    .total_deposited
                    .checked_add(amount)
                    .ok_or(ProtocolError::ArithmeticOverflow)?;
                Ok(Transition::quiet(next))
            }
            Command::WithdrawQuery => {
                let current = state.ok_or(ProtocolError::SubLedgerNotActive(self.address))?;
                let mut next = current.clone();
                next.last_withdraw = now.max(current.last_withdraw);
                let reply = Message::new(
                    self.address,
                    self.vault,
                    self.fees.relay(msg.value),
                    Command::WithdrawSettlement {
                        owner: self.owner,
                        total_user_deposit: current.total_deposited,
                        last_withdraw: current.last_withdraw,
                        now: next.last_withdraw,
                    }
                    .encode(),
                );
                Ok(Transition::send(next, reply))
            }
            other => Err(ProtocolError::MalformedMessage(format!(
                "{other:?} at sub-ledger"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::COIN;

    const VAULT: Address = Address([0xEE; 32]);
    const OWNER: Address = Address([0x11; 32]);
    const SELF: Address = Address([0x55; 32]);

    fn ledger() -> SubLedger {
        SubLedger::new(SELF, SubLedgerInit { vault: VAULT, owner: OWNER }, FeeSchedule::default())
    }

    fn forward(amount: u64) -> Message {
        Message::new(VAULT, SELF, 0, Command::DepositForward { amount }.encode())
    }

    fn query(gas: u64) -> Message {
        Message::new(VAULT, SELF, gas, Command::WithdrawQuery.encode())
    }

    #[test]
    fn first_forward_creates_state() {
        let tr = ledger().handle(None, &forward(49), 10).unwrap();
        assert_eq!(tr.state.vault, VAULT);
        assert_eq!(tr.state.owner, OWNER);
        assert_eq!(tr.state.total_deposited, 49);
        assert_eq!(tr.state.last_withdraw, 0);
        assert!(tr.outbound.is_empty());
    }

    #[test]
    fn forwards_accumulate() {
        let s = ledger();
        let first = s.handle(None, &forward(49), 10).unwrap().state;
        let second = s.handle(Some(&first), &forward(49), 11).unwrap().state;
        assert_eq!(second.total_deposited, 98);
    }

    #[test]
    fn query_snapshots_then_advances() {
        let s = ledger();
        let state = s.handle(None, &forward(49), 10).unwrap().state;
        let tr = s.handle(Some(&state), &query(COIN), 500).unwrap();
        assert_eq!(tr.state.last_withdraw, 500);
        let reply = &tr.outbound[0];
        assert_eq!(reply.to, VAULT);
        assert_eq!(reply.value, COIN - COIN / 100);
        assert_eq!(
            Command::decode(&reply.body, ActorKind::Vault).unwrap(),
            Command::WithdrawSettlement {
                owner: OWNER,
                total_user_deposit: 49,
                last_withdraw: 0,
                now: 500,
            }
        );
    }

    #[test]
    fn overlapping_queries_do_not_double_claim() {
        let s = ledger();
        let state = s.handle(None, &forward(49), 10).unwrap().state;
        let first = s.handle(Some(&state), &query(COIN), 500).unwrap();
        let second = s.handle(Some(&first.state), &query(COIN), 500).unwrap();
        match Command::decode(&second.outbound[0].body, ActorKind::Vault).unwrap() {
            Command::WithdrawSettlement { last_withdraw, now, .. } => {
                assert_eq!(last_withdraw, now);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn query_on_absent_ledger_aborts() {
        assert_eq!(
            ledger().handle(None, &query(COIN), 500),
            Err(ProtocolError::SubLedgerNotActive(SELF))
        );
    }

    #[test]
    fn foreign_sender_rejected() {
        let mut msg = forward(1_000 * COIN);
        msg.from = OWNER;
        assert_eq!(
            ledger().handle(None, &msg, 10),
            Err(ProtocolError::InvalidVaultSender { sender: OWNER, expected: VAULT })
        );
    }

    #[test]
    fn vault_commands_rejected() {
        let msg = Message::new(VAULT, SELF, 0, Command::Deposit.encode());
        assert_eq!(
            ledger().handle(None, &msg, 10),
            Err(ProtocolError::InvalidCommand(b'd'))
        );
    }
}
