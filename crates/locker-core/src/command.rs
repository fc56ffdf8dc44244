//! Command vocabulary and its wire codec.
//!
//! Every body starts with a big-endian `u32` op. Op `0` is a text command
//! whose tail is a single tag byte; the internal ops carry fixed-size
//! big-endian payloads. The same tag byte `w` means a withdraw request at a
//! vault and a withdraw query at a sub-ledger, so decoding needs to know which
//! kind of actor is receiving.

use bytes::{Buf, BufMut};

use crate::constants::{
    OP_DEPOSIT_FORWARD, OP_TEXT_COMMAND, OP_WITHDRAW_SETTLEMENT, TAG_DEPOSIT, TAG_REWARD,
    TAG_WITHDRAW,
};
use crate::error::ProtocolError;
use crate::types::{Address, Timestamp};

const OP_LEN: usize = 4;
const DEPOSIT_FORWARD_LEN: usize = 8;
const SETTLEMENT_LEN: usize = 32 + 8 + 8 + 8;

/// The receiving side of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActorKind {
    Vault,
    SubLedger,
}

/// A decoded protocol command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Depositor to vault: add to the reward pool.
    Reward,
    /// Depositor to vault: lock the attached value.
    Deposit,
    /// Depositor to vault: start a withdrawal round-trip.
    WithdrawRequest,
    /// Vault to sub-ledger: credit a net deposit.
    DepositForward { amount: u64 },
    /// Vault to sub-ledger: snapshot and advance the withdraw cursor.
    WithdrawQuery,
    /// Sub-ledger to vault: figures for the pending payout.
    WithdrawSettlement {
        owner: Address,
        total_user_deposit: u64,
        last_withdraw: Timestamp,
        now: Timestamp,
    },
}

impl Command {
    /// Serialize to the wire body.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(OP_LEN + SETTLEMENT_LEN);
        match self {
            Self::Reward => text(&mut buf, TAG_REWARD),
            Self::Deposit => text(&mut buf, TAG_DEPOSIT),
            Self::WithdrawRequest | Self::WithdrawQuery => text(&mut buf, TAG_WITHDRAW),
            Self::DepositForward { amount } => {
                buf.put_u32(OP_DEPOSIT_FORWARD);
                buf.put_u64(*amount);
            }
            Self::WithdrawSettlement {
                owner,
                total_user_deposit,
                last_withdraw,
                now,
            } => {
                buf.put_u32(OP_WITHDRAW_SETTLEMENT);
                buf.put_slice(owner.as_bytes());
                buf.put_u64(*total_user_deposit);
                buf.put_u64(*last_withdraw);
                buf.put_u64(*now);
            }
        }
        buf
    }

    /// Parse a wire body addressed to an actor of kind `kind`.
    pub fn decode(body: &[u8], kind: ActorKind) -> Result<Self, ProtocolError> {
        if body.len() < OP_LEN {
            return Err(ProtocolError::MalformedMessage(format!(
                "body of {} bytes has no op header",
                body.len()
            )));
        }
        let mut buf = body;
        let op = buf.get_u32();
        match (op, kind) {
            (OP_TEXT_COMMAND, _) => decode_text(buf, kind),
            (OP_DEPOSIT_FORWARD, ActorKind::SubLedger) => {
                expect_len(op, buf, DEPOSIT_FORWARD_LEN)?;
                Ok(Self::DepositForward {
                    amount: buf.get_u64(),
                })
            }
            (OP_WITHDRAW_SETTLEMENT, ActorKind::Vault) => {
                expect_len(op, buf, SETTLEMENT_LEN)?;
                let mut owner = [0u8; 32];
                buf.copy_to_slice(&mut owner);
                Ok(Self::WithdrawSettlement {
                    owner: Address(owner),
                    total_user_deposit: buf.get_u64(),
                    last_withdraw: buf.get_u64(),
                    now: buf.get_u64(),
                })
            }
            _ => Err(ProtocolError::UnsupportedOperation(op)),
        }
    }
}

fn text(buf: &mut Vec<u8>, tag: u8) {
    buf.put_u32(OP_TEXT_COMMAND);
    buf.put_u8(tag);
}

fn decode_text(tail: &[u8], kind: ActorKind) -> Result<Command, ProtocolError> {
    let [tag] = tail else {
        return Err(ProtocolError::InvalidCommandLength(tail.len()));
    };
    match (kind, *tag) {
        (ActorKind::Vault, TAG_REWARD) => Ok(Command::Reward),
        (ActorKind::Vault, TAG_DEPOSIT) => Ok(Command::Deposit),
        (ActorKind::Vault, TAG_WITHDRAW) => Ok(Command::WithdrawRequest),
        (ActorKind::SubLedger, TAG_WITHDRAW) => Ok(Command::WithdrawQuery),
        (_, other) => Err(ProtocolError::InvalidCommand(other)),
    }
}

fn expect_len(op: u32, payload: &[u8], want: usize) -> Result<(), ProtocolError> {
    if payload.len() != want {
        return Err(ProtocolError::MalformedMessage(format!(
            "op {op:#010x}: payload is {} bytes, expected {want}",
            payload.len()
        )));
    }
    Ok(())
}
