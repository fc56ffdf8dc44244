//! Criterion benchmarks for locker-node storage and delivery.
//!
//! Covers: a full deposit round (vault plus sub-ledger commit) and sub-ledger
//! lookup via RocksDB-backed storage.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use parking_lot::RwLock;
use tempfile::TempDir;

use locker_core::address::SubLedgerKey;
use locker_core::command::Command;
use locker_core::constants::COIN;
use locker_core::fees::FeeSchedule;
use locker_core::schedule::VestingSchedule;
use locker_core::store::LedgerStore;
use locker_core::types::{Address, Message, VaultState};

use locker_node_lib::runtime::Runtime;
use locker_node_lib::storage::RocksStore;

const T: u64 = 1_685_889_892;

fn setup() -> (TempDir, Runtime<RocksStore>, Address) {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(RwLock::new(RocksStore::open(dir.path()).unwrap()));
    let mut rt = Runtime::new(store, FeeSchedule::default());
    let schedule = VestingSchedule::new(u64::MAX, T + 1000, 600, 60).unwrap();
    let vault = rt.deploy(VaultState::new(schedule)).unwrap();
    (dir, rt, vault)
}

fn bench_deposit_round(c: &mut Criterion) {
    let (_dir, mut rt, vault) = setup();
    let mut n = 0u64;
    c.bench_function("deposit_round", |b| {
        b.iter(|| {
            n += 1;
            let mut owner = [0u8; 32];
            owner[..8].copy_from_slice(&n.to_le_bytes());
            let msg = Message::new(Address(owner), vault, 50 * COIN, Command::Deposit.encode());
            rt.send(black_box(msg), T).unwrap()
        })
    });
}

fn bench_sub_ledger_lookup(c: &mut Criterion) {
    let (_dir, mut rt, vault) = setup();
    let owner = Address([0x11; 32]);
    rt.send(Message::new(owner, vault, 50 * COIN, Command::Deposit.encode()), T)
        .unwrap();
    let key = SubLedgerKey::new(vault, owner);
    let store = Arc::clone(rt.store());

    c.bench_function("sub_ledger_lookup", |b| {
        b.iter(|| store.read().get_sub_ledger(black_box(&key)))
    });
}

criterion_group!(benches, bench_deposit_round, bench_sub_ledger_lookup);
criterion_main!(benches);
