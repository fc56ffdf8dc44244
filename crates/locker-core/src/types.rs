//! Core protocol types: identities, messages, persisted actor state.
//!
//! All monetary values are in units (1 COIN = 10^9 units).
//! All timestamps are Unix seconds supplied by the host clock.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::AddressError;
use crate::schedule::VestingSchedule;

/// Unix timestamp in seconds, as supplied by the hosting environment.
pub type Timestamp = u64;

/// A 32-byte hash value. Used for sub-ledger template (code) hashes.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The zero hash.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the zero hash.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Identity of an actor or external account.
///
/// Vaults, sub-ledgers, and depositor wallets share this address space.
/// Text form is 64 lowercase hex characters.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        if s.len() != 64 {
            return Err(AddressError::InvalidLength(s.len()));
        }
        let bytes = hex::decode(s).map_err(|_| AddressError::InvalidHex)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidLength(s.len()))?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Identifies the sub-ledger a message is addressed to, so the host can
/// create it on first arrival.
///
/// The destination address must equal the deterministic address derived from
/// these fields and the vault's template; otherwise the init is ignored.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash,
    bincode::Encode, bincode::Decode,
)]
pub struct SubLedgerInit {
    /// The owning vault.
    pub vault: Address,
    /// The depositor this sub-ledger accounts for.
    pub owner: Address,
}

/// A message between actors or accounts.
///
/// `value` is the attached transfer; `body` is the wire-encoded command
/// (empty for a plain transfer).
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Message {
    pub from: Address,
    pub to: Address,
    pub value: u64,
    pub body: Vec<u8>,
    pub init: Option<SubLedgerInit>,
}

impl Message {
    /// A message without sub-ledger init.
    pub fn new(from: Address, to: Address, value: u64, body: Vec<u8>) -> Self {
        Self {
            from,
            to,
            value,
            body,
            init: None,
        }
    }

    /// Attach a sub-ledger init.
    pub fn with_init(mut self, init: SubLedgerInit) -> Self {
        self.init = Some(init);
        self
    }

    /// True for a plain value transfer with no command.
    pub fn is_transfer(&self) -> bool {
        self.body.is_empty()
    }
}

/// Persistent state of a vault actor.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct VaultState {
    /// Sum of all net deposits.
    pub total_locked: u64,
    /// Sum of all net reward contributions.
    pub total_reward: u64,
    /// Deposit window and unlock schedule.
    pub schedule: VestingSchedule,
    /// Template hash mixed into sub-ledger address derivation.
    pub sub_ledger_template: Hash256,
}

impl VaultState {
    /// A fresh vault with zero totals and the default sub-ledger template.
    pub fn new(schedule: VestingSchedule) -> Self {
        Self {
            total_locked: 0,
            total_reward: 0,
            schedule,
            sub_ledger_template: crate::address::default_sub_ledger_template(),
        }
    }

    /// Flattened view returned by the vault state query.
    pub fn snapshot(&self) -> VaultSnapshot {
        VaultSnapshot {
            total_locked: self.total_locked,
            total_reward: self.total_reward,
            deposit_window_end: self.schedule.deposit_window_end,
            vesting_start: self.schedule.vesting_start,
            vesting_duration: self.schedule.vesting_duration,
            unlock_period: self.schedule.unlock_period,
        }
    }
}

/// Read-only view of a vault, as returned by `GetVaultState`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct VaultSnapshot {
    pub total_locked: u64,
    pub total_reward: u64,
    pub deposit_window_end: Timestamp,
    pub vesting_start: Timestamp,
    pub vesting_duration: u64,
    pub unlock_period: u64,
}

/// Persistent state of one depositor's sub-ledger.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct SubLedgerState {
    /// The owning vault. Immutable.
    pub vault: Address,
    /// The depositor. Immutable.
    pub owner: Address,
    /// Sum of all forwarded net deposits. Nondecreasing.
    pub total_deposited: u64,
    /// Time of the last withdraw query, 0 before the first. Nondecreasing.
    pub last_withdraw: Timestamp,
}

impl SubLedgerState {
    /// An empty sub-ledger for `(vault, owner)`.
    pub fn new(vault: Address, owner: Address) -> Self {
        Self {
            vault,
            owner,
            total_deposited: 0,
            last_withdraw: 0,
        }
    }
}

/// Result of one successful handler run: the state to commit and the
/// messages to dispatch after the commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition<S> {
    pub state: S,
    pub outbound: Vec<Message>,
}

impl<S> Transition<S> {
    /// State change with no outbound messages.
    pub fn quiet(state: S) -> Self {
        Self {
            state,
            outbound: Vec::new(),
        }
    }

    /// State change followed by one outbound message.
    pub fn send(state: S, msg: Message) -> Self {
        Self {
            state,
            outbound: vec![msg],
        }
    }
}
