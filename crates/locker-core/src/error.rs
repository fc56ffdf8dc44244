//! Error types for the Locker protocol.
use thiserror::Error;

use crate::types::Address;

/// Abort codes raised while an actor processes a single message.
///
/// An abort discards the handler's state changes and outbound messages; the
/// code is surfaced in the receipt for that message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("deposits closed: now {now} >= window end {window_end}")] DepositsClosed { now: u64, window_end: u64 },
    #[error("insufficient deposit: {value} <= {min}")] InsufficientDeposit { value: u64, min: u64 },
    #[error("insufficient reward contribution: {value} <= {min}")] InsufficientRewardContribution { value: u64, min: u64 },
    #[error("insufficient gas for withdraw: {value} < {min}")] InsufficientGasForWithdraw { value: u64, min: u64 },
    #[error("withdraw not yet available: now {now} < {available_at}")] WithdrawNotYetAvailable { now: u64, available_at: u64 },
    #[error("invalid sub-ledger sender {sender}, expected {expected}")] InvalidSubLedgerSender { sender: Address, expected: Address },
    #[error("invalid vault sender {sender}, expected {expected}")] InvalidVaultSender { sender: Address, expected: Address },
    #[error("sub-ledger not active: {0}")] SubLedgerNotActive(Address),
    #[error("external message claims hosted actor {0} as sender")] ForgedOrigin(Address),
    #[error("unsupported operation: {0:#010x}")] UnsupportedOperation(u32),
    #[error("invalid command: {0:#04x}")] InvalidCommand(u8),
    #[error("invalid command length: {0}")] InvalidCommandLength(usize),
    #[error("malformed message: {0}")] MalformedMessage(String),
    #[error("arithmetic overflow")] ArithmeticOverflow,
}

impl ProtocolError {
    /// Stable numeric status code for this abort.
    ///
    /// `MalformedMessage` keeps 9, the cell-underflow code clients already
    /// match on; the rest live in a dedicated range.
    pub fn exit_code(&self) -> u32 {
        match self {
            Self::MalformedMessage(_) => 9,
            Self::UnsupportedOperation(_) => 101,
            Self::InvalidCommand(_) => 102,
            Self::InvalidCommandLength(_) => 103,
            Self::DepositsClosed { .. } => 110,
            Self::InsufficientRewardContribution { .. } => 111,
            Self::InsufficientDeposit { .. } => 112,
            Self::InsufficientGasForWithdraw { .. } => 113,
            Self::WithdrawNotYetAvailable { .. } => 114,
            Self::InvalidSubLedgerSender { .. } => 120,
            Self::InvalidVaultSender { .. } => 121,
            Self::SubLedgerNotActive(_) => 122,
            Self::ForgedOrigin(_) => 123,
            Self::ArithmeticOverflow => 130,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unlock period must be non-zero")] ZeroUnlockPeriod,
    #[error("vesting duration must be non-zero")] ZeroVestingDuration,
    #[error("vesting duration {duration} is not a multiple of unlock period {period}")] DurationNotMultipleOfPeriod { duration: u64, period: u64 },
    #[error("{name} threshold {threshold} must exceed fee {fee}")] ThresholdBelowFee { name: &'static str, threshold: u64, fee: u64 },
    #[error("invalid value for {key}: {value}")] InvalidValue { key: String, value: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid address length: {0}, expected 64 hex chars")] InvalidLength(usize),
    #[error("invalid hex in address")] InvalidHex,
}

#[derive(Error, Debug)]
pub enum LockerError {
    #[error(transparent)] Protocol(#[from] ProtocolError),
    #[error(transparent)] Config(#[from] ConfigError),
    #[error("vault already deployed at {0}")] AlreadyDeployed(Address),
    #[error("unknown vault: {0}")] UnknownVault(Address),
    #[error("clock regression: {now} < {current}")] ClockRegression { now: u64, current: u64 },
    #[error("storage: {0}")] Storage(String),
}
