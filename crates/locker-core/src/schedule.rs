//! Deposit window and stepwise unlock curve.
//!
//! The curve releases `amount / periods_total` at each period boundary after
//! `vesting_start`:
//!
//! ```text
//! elapsed         = max(0, t - vesting_start)
//! periods_elapsed = min(periods_total, elapsed / unlock_period)
//! unlocked_of     = amount * periods_elapsed / periods_total
//! ```
//!
//! Nothing is unlocked before `vesting_start + unlock_period`, and the full
//! amount is unlocked at and after `vesting_start + vesting_duration`.
//! Products are computed in `u128` and truncate toward zero.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::Timestamp;

/// Schedule parameters fixed at vault deployment.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct VestingSchedule {
    /// Deposits and reward contributions are accepted strictly before this.
    pub deposit_window_end: Timestamp,
    /// Unlocking counts periods from here.
    pub vesting_start: Timestamp,
    /// Total vesting length in seconds. A multiple of `unlock_period`.
    pub vesting_duration: u64,
    /// Step length in seconds.
    pub unlock_period: u64,
}

impl VestingSchedule {
    /// Build a validated schedule.
    pub fn new(
        deposit_window_end: Timestamp,
        vesting_start: Timestamp,
        vesting_duration: u64,
        unlock_period: u64,
    ) -> Result<Self, ConfigError> {
        let schedule = Self {
            deposit_window_end,
            vesting_start,
            vesting_duration,
            unlock_period,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Check the period invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.unlock_period == 0 {
            return Err(ConfigError::ZeroUnlockPeriod);
        }
        if self.vesting_duration == 0 {
            return Err(ConfigError::ZeroVestingDuration);
        }
        if self.vesting_duration % self.unlock_period != 0 {
            return Err(ConfigError::DurationNotMultipleOfPeriod {
                duration: self.vesting_duration,
                period: self.unlock_period,
            });
        }
        Ok(())
    }

    /// Number of unlock steps. At least 1 for a valid schedule.
    pub fn periods_total(&self) -> u64 {
        if self.unlock_period == 0 {
            return 0;
        }
        self.vesting_duration / self.unlock_period
    }

    /// Whether deposits and reward contributions are accepted at `t`.
    pub fn deposits_open(&self, t: Timestamp) -> bool {
        t < self.deposit_window_end
    }

    /// First instant at which a withdraw request is accepted.
    pub fn withdraw_available_at(&self) -> Timestamp {
        self.vesting_start.saturating_add(self.unlock_period)
    }

    /// Instant at which the full amount is unlocked.
    pub fn vesting_end(&self) -> Timestamp {
        self.vesting_start.saturating_add(self.vesting_duration)
    }

    /// Completed unlock periods at `t`, capped at `periods_total`.
    pub fn periods_elapsed(&self, t: Timestamp) -> u64 {
        if self.unlock_period == 0 {
            return 0;
        }
        let elapsed = t.saturating_sub(self.vesting_start);
        (elapsed / self.unlock_period).min(self.periods_total())
    }

    /// The next step boundary strictly after `t`, or `None` once fully vested.
    pub fn next_unlock_at(&self, t: Timestamp) -> Option<Timestamp> {
        let done = self.periods_elapsed(t);
        if done >= self.periods_total() {
            return None;
        }
        let steps = done.checked_add(1)?;
        self.vesting_start
            .checked_add(steps.checked_mul(self.unlock_period)?)
    }

    /// Portion of `amount` unlocked at time `t`.
    pub fn unlocked_of(&self, amount: u64, t: Timestamp) -> u64 {
        let total = self.periods_total();
        if total == 0 {
            return 0;
        }
        let done = self.periods_elapsed(t);
        // done <= total, so the quotient never exceeds amount.
        ((amount as u128 * done as u128) / total as u128) as u64
    }
}
