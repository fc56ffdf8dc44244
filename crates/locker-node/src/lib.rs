//! # locker-node
//! Actor host: RocksDB storage, runtime, and RPC.
//!
//! Hosts Locker vaults and their sub-ledgers:
//! - [`storage::RocksStore`]: persistent actor state backed by RocksDB
//! - [`runtime::Runtime`]: mailboxes, logical clock, and commit-then-send delivery
//! - [`node::Node`]: composition, command loop, and receipt broadcast
//! - [`rpc`]: JSON-RPC server for external access
//! - [`config::NodeConfig`]: node configuration
//! - [`logging`]: tracing subscriber setup

pub mod config;
pub mod logging;
pub mod node;
pub mod rpc;
pub mod runtime;
pub mod storage;

pub use config::NodeConfig;
pub use node::Node;
pub use rpc::start_rpc_server;
pub use runtime::{Outcome, Receipt, Runtime};
pub use storage::RocksStore;
