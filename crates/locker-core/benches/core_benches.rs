//! Criterion benchmarks for locker-core hot paths.
//!
//! Covers: unlock curve, entitlement math, sub-ledger address derivation,
//! and command decoding.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use locker_core::address::{default_sub_ledger_template, derive_sub_ledger_address};
use locker_core::command::{ActorKind, Command};
use locker_core::entitlement::{withdraw_amount, PoolTotals};
use locker_core::schedule::VestingSchedule;
use locker_core::types::Address;

const T: u64 = 1_685_889_892;

fn schedule() -> VestingSchedule {
    VestingSchedule::new(T + 100, T + 1000, 600, 60).expect("valid schedule")
}

fn bench_unlock_curve(c: &mut Criterion) {
    let s = schedule();
    c.bench_function("unlocked_of", |b| {
        b.iter(|| s.unlocked_of(black_box(49_000_000_000), black_box(T + 1300)))
    });
}

fn bench_withdraw_amount(c: &mut Criterion) {
    let s = schedule();
    let totals = PoolTotals {
        total_locked: 248_000_000_000,
        total_reward: 665_000_000_000,
    };
    c.bench_function("withdraw_amount", |b| {
        b.iter(|| {
            withdraw_amount(
                &s,
                totals,
                black_box(T + 1600),
                black_box(T + 1120),
                black_box(49_000_000_000),
            )
        })
    });
}

fn bench_address_derivation(c: &mut Criterion) {
    let template = default_sub_ledger_template();
    let vault = Address([0xEE; 32]);
    let owner = Address([0x11; 32]);
    c.bench_function("derive_sub_ledger_address", |b| {
        b.iter(|| derive_sub_ledger_address(black_box(&vault), black_box(&owner), &template))
    });
}

fn bench_command_decode(c: &mut Criterion) {
    let body = Command::WithdrawSettlement {
        owner: Address([0x11; 32]),
        total_user_deposit: 49_000_000_000,
        last_withdraw: T + 1060,
        now: T + 1600,
    }
    .encode();
    c.bench_function("decode_settlement", |b| {
        b.iter(|| Command::decode(black_box(&body), ActorKind::Vault))
    });
}

criterion_group!(
    benches,
    bench_unlock_curve,
    bench_withdraw_amount,
    bench_address_derivation,
    bench_command_decode,
);
criterion_main!(benches);
