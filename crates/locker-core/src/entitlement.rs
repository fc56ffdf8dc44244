//! Entitlement math: principal unlock plus proportional reward unlock.
//!
//! The reward share is recomputed from the pool totals at the moment of
//! settlement, so a depositor's share shifts as other depositors join.
//! Every division truncates, which rounds in favour of the pool.

use crate::schedule::VestingSchedule;
use crate::types::{Timestamp, VaultState};

/// Aggregate pool figures the entitlement depends on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolTotals {
    pub total_locked: u64,
    pub total_reward: u64,
}

impl From<&VaultState> for PoolTotals {
    fn from(state: &VaultState) -> Self {
        Self {
            total_locked: state.total_locked,
            total_reward: state.total_reward,
        }
    }
}

/// Proportional share of the reward pool for `deposit`.
///
/// Zero when nothing is locked. Saturates at `u64::MAX` if a deposit larger
/// than the pool is reported.
pub fn reward_allocation(totals: PoolTotals, deposit: u64) -> u64 {
    if totals.total_locked == 0 {
        return 0;
    }
    let share = totals.total_reward as u128 * deposit as u128 / totals.total_locked as u128;
    u64::try_from(share).unwrap_or(u64::MAX)
}

/// Cumulative amount unlocked for `deposit` at time `t`.
pub fn entitlement(
    schedule: &VestingSchedule,
    totals: PoolTotals,
    t: Timestamp,
    deposit: u64,
) -> u64 {
    let principal = schedule.unlocked_of(deposit, t);
    let reward = schedule.unlocked_of(reward_allocation(totals, deposit), t);
    principal.saturating_add(reward)
}

/// Amount claimable between `last` and `now`.
///
/// Returns 0 when `last > now` rather than underflowing.
pub fn withdraw_amount(
    schedule: &VestingSchedule,
    totals: PoolTotals,
    now: Timestamp,
    last: Timestamp,
    deposit: u64,
) -> u64 {
    if last > now {
        return 0;
    }
    entitlement(schedule, totals, now, deposit)
        .saturating_sub(entitlement(schedule, totals, last, deposit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const T: u64 = 1_685_889_892;

    fn schedule() -> VestingSchedule {
        VestingSchedule::new(T + 100, T + 1000, 600, 60).unwrap()
    }

    fn totals() -> PoolTotals {
        PoolTotals {
            total_locked: 10_000,
            total_reward: 500,
        }
    }

    #[test]
    fn allocation_is_proportional() {
        assert_eq!(reward_allocation(totals(), 10_000), 500);
        assert_eq!(reward_allocation(totals(), 4_000), 200);
        assert_eq!(reward_allocation(totals(), 0), 0);
    }

    #[test]
    fn allocation_zero_when_pool_empty() {
        let empty = PoolTotals {
            total_locked: 0,
            total_reward: 1_000,
        };
        assert_eq!(reward_allocation(empty, 5_000), 0);
    }

    #[test]
    fn full_depositor_first_step_and_rest() {
        let s = schedule();
        assert_eq!(withdraw_amount(&s, totals(), T + 1060, 0, 10_000), 1050);
        assert_eq!(withdraw_amount(&s, totals(), T + 1_000_000, T + 1120, 10_000), 8400);
    }

    #[test]
    fn partial_depositor() {
        let s = schedule();
        assert_eq!(withdraw_amount(&s, totals(), T + 1060, 0, 4_000), 420);
        assert_eq!(withdraw_amount(&s, totals(), T + 1120, 0, 4_000), 840);
    }

    #[test]
    fn zero_deposit_yields_nothing() {
        let s = schedule();
        assert_eq!(withdraw_amount(&s, totals(), T + 1_000_000, 0, 0), 0);
        assert_eq!(entitlement(&s, totals(), T + 1600, 0), 0);
    }

    #[test]
    fn reversed_timestamps_yield_zero() {
        let s = schedule();
        assert_eq!(withdraw_amount(&s, totals(), T + 1060, T + 1600, 10_000), 0);
    }

    #[test]
    fn same_period_yields_zero() {
        let s = schedule();
        assert_eq!(withdraw_amount(&s, totals(), T + 1119, T + 1060, 5_000), 0);
    }

    #[test]
    fn fully_vested_entitlement() {
        let s = schedule();
        assert_eq!(entitlement(&s, totals(), T + 1600, 5_000), 5_250);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        /// Splitting a claim at any midpoint never changes the total.
        #[test]
        fn withdrawals_tile(
            deposit in 0u64..1_000_000_000_000,
            a in 0u64..2000,
            b in 0u64..2000,
            c in 0u64..2000,
        ) {
            let s = schedule();
            let p = PoolTotals { total_locked: 2_000_000_000_000, total_reward: 700_000_000_000 };
            let mut ts = [T + a, T + b, T + c];
            ts.sort_unstable();
            let split = withdraw_amount(&s, p, ts[1], ts[0], deposit)
                + withdraw_amount(&s, p, ts[2], ts[1], deposit);
            prop_assert_eq!(split, withdraw_amount(&s, p, ts[2], ts[0], deposit));
        }

        /// Summed claims never exceed the deposit plus its reward share.
        #[test]
        fn claims_bounded(deposit in 0u64..1_000_000_000_000, t in any::<u64>()) {
            let s = schedule();
            let p = PoolTotals { total_locked: 1_000_000_000_000, total_reward: 300_000_000_000 };
            let bound = deposit + reward_allocation(p, deposit);
            prop_assert!(withdraw_amount(&s, p, t, 0, deposit) <= bound);
        }
    }
}
