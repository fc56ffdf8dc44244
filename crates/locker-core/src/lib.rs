//! # locker-core
//! Foundation types, vesting math, and actor handlers for the Locker vault.

pub mod address;
pub mod command;
pub mod constants;
pub mod entitlement;
pub mod error;
pub mod fees;
pub mod query;
pub mod schedule;
pub mod store;
pub mod sub_ledger;
pub mod types;
pub mod vault;
