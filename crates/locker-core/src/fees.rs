//! Fee schedule and inbound value thresholds.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_FEE, DEFAULT_MIN_DEPOSIT_VALUE, DEFAULT_MIN_REWARD_VALUE, DEFAULT_MIN_WITHDRAW_GAS,
    DEFAULT_RELAY_FEE,
};
use crate::error::{ConfigError, ProtocolError};

/// Deductions and minimum values applied by the vault.
///
/// Deposits and reward contributions must carry strictly more than their
/// threshold; a withdraw request must carry at least `min_withdraw_gas`.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct FeeSchedule {
    /// Deducted from every deposit and reward contribution.
    pub fee: u64,
    pub min_deposit_value: u64,
    pub min_reward_value: u64,
    pub min_withdraw_gas: u64,
    /// Consumed by each relayed hop of the withdraw round-trip.
    pub relay_fee: u64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            fee: DEFAULT_FEE,
            min_deposit_value: DEFAULT_MIN_DEPOSIT_VALUE,
            min_reward_value: DEFAULT_MIN_REWARD_VALUE,
            min_withdraw_gas: DEFAULT_MIN_WITHDRAW_GAS,
            relay_fee: DEFAULT_RELAY_FEE,
        }
    }
}

impl FeeSchedule {
    /// Thresholds must exceed the fee so net amounts stay positive, and the
    /// withdraw gas must cover both relayed hops.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_deposit_value <= self.fee {
            return Err(ConfigError::ThresholdBelowFee {
                name: "min_deposit_value",
                threshold: self.min_deposit_value,
                fee: self.fee,
            });
        }
        if self.min_reward_value <= self.fee {
            return Err(ConfigError::ThresholdBelowFee {
                name: "min_reward_value",
                threshold: self.min_reward_value,
                fee: self.fee,
            });
        }
        let round_trip = self.relay_fee.saturating_mul(2);
        if self.min_withdraw_gas < round_trip {
            return Err(ConfigError::ThresholdBelowFee {
                name: "min_withdraw_gas",
                threshold: self.min_withdraw_gas,
                fee: round_trip,
            });
        }
        Ok(())
    }

    /// Net deposit after the fee, or the abort for an undersized one.
    pub fn net_deposit(&self, value: u64) -> Result<u64, ProtocolError> {
        if value <= self.min_deposit_value {
            return Err(ProtocolError::InsufficientDeposit {
                value,
                min: self.min_deposit_value,
            });
        }
        Ok(self.net_of(value))
    }

    /// Net reward contribution after the fee.
    pub fn net_reward(&self, value: u64) -> Result<u64, ProtocolError> {
        if value <= self.min_reward_value {
            return Err(ProtocolError::InsufficientRewardContribution {
                value,
                min: self.min_reward_value,
            });
        }
        Ok(self.net_of(value))
    }

    /// Gas forwarded after one relay hop, or the abort for too little gas.
    pub fn check_withdraw_gas(&self, value: u64) -> Result<u64, ProtocolError> {
        if value < self.min_withdraw_gas {
            return Err(ProtocolError::InsufficientGasForWithdraw {
                value,
                min: self.min_withdraw_gas,
            });
        }
        Ok(self.relay(value))
    }

    /// `value - fee`, floored at zero.
    pub fn net_of(&self, value: u64) -> u64 {
        value.saturating_sub(self.fee)
    }

    /// Value left after one relayed hop.
    pub fn relay(&self, value: u64) -> u64 {
        value.saturating_sub(self.relay_fee)
    }
}
