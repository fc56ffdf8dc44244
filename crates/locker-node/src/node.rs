//! Node composition and command loop.
//!
//! The [`Node`] owns the RocksDB store behind a `RwLock` (read-only queries
//! proceed while messages are processed) and the [`Runtime`] behind a
//! `Mutex` (one writer at a time). Submissions arrive either by direct call
//! or through the async command channel drained by [`Node::run`]. Every
//! receipt is broadcast to subscribers.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info};

use locker_core::error::LockerError;
use locker_core::query;
use locker_core::store::LedgerStore;
use locker_core::types::{Address, Message, SubLedgerState, Timestamp, VaultSnapshot, VaultState};

use crate::config::NodeConfig;
use crate::runtime::{Receipt, Runtime};
use crate::storage::RocksStore;

/// Capacity of the receipt broadcast channel.
const RECEIPT_CHANNEL_CAPACITY: usize = 1024;

/// Capacity of the command queue.
const COMMAND_CHANNEL_CAPACITY: usize = 256;

/// A request processed by the command loop.
pub enum NodeCommand {
    Deploy {
        state: VaultState,
        reply: oneshot::Sender<Result<Address, LockerError>>,
    },
    Send {
        message: Message,
        /// Logical time to deliver at; the wall clock when `None`.
        now: Option<Timestamp>,
        reply: oneshot::Sender<Result<Vec<Receipt>, LockerError>>,
    },
}

/// The Locker host node.
pub struct Node {
    storage: Arc<RwLock<RocksStore>>,
    runtime: Mutex<Runtime<RocksStore>>,
    receipts: broadcast::Sender<Receipt>,
    cmd_tx: mpsc::Sender<NodeCommand>,
    cmd_rx: tokio::sync::Mutex<mpsc::Receiver<NodeCommand>>,
    config: NodeConfig,
}

impl Node {
    /// Open storage and build the runtime.
    pub fn open(config: NodeConfig) -> Result<Arc<Self>, LockerError> {
        config.fees.validate()?;
        let store = RocksStore::open(config.db_path())?;
        let storage = Arc::new(RwLock::new(store));
        let runtime = Mutex::new(Runtime::new(Arc::clone(&storage), config.fees));
        let (receipts, _) = broadcast::channel(RECEIPT_CHANNEL_CAPACITY);
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

        {
            let store = storage.read();
            info!(
                path = %config.db_path().display(),
                vaults = store.vault_count()?,
                sub_ledgers = store.sub_ledger_count()?,
                clock = store.clock()?,
                "opened ledger store"
            );
        }

        Ok(Arc::new(Self {
            storage,
            runtime,
            receipts,
            cmd_tx,
            cmd_rx: tokio::sync::Mutex::new(cmd_rx),
            config,
        }))
    }

    /// Deploy a vault and return its address.
    pub fn deploy(&self, state: VaultState) -> Result<Address, LockerError> {
        self.runtime.lock().deploy(state)
    }

    /// Deliver `msg` at logical time `now` and everything it triggers.
    pub fn send_message(&self, msg: Message, now: Timestamp) -> Result<Vec<Receipt>, LockerError> {
        let receipts = self.runtime.lock().send(msg, now)?;
        for receipt in &receipts {
            // No subscribers is fine.
            let _ = self.receipts.send(receipt.clone());
        }
        Ok(receipts)
    }

    /// Deliver `msg` at the later of the wall clock and the logical clock.
    pub fn send_message_now(&self, msg: Message) -> Result<Vec<Receipt>, LockerError> {
        let now = self.wall_clock().max(self.now()?);
        self.send_message(msg, now)
    }

    /// Stream of every receipt produced from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Receipt> {
        self.receipts.subscribe()
    }

    /// Sender half of the command queue.
    pub fn command_sender(&self) -> mpsc::Sender<NodeCommand> {
        self.cmd_tx.clone()
    }

    /// Queue a message through the command loop and wait for its receipts.
    pub async fn submit(
        &self,
        message: Message,
        now: Option<Timestamp>,
    ) -> Result<Vec<Receipt>, LockerError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(NodeCommand::Send {
                message,
                now,
                reply,
            })
            .await
            .map_err(|_| LockerError::Storage("command loop stopped".into()))?;
        rx.await
            .map_err(|_| LockerError::Storage("command dropped".into()))?
    }

    /// Drain the command queue until every sender is gone.
    pub async fn run(self: &Arc<Self>) {
        let mut rx = self.cmd_rx.lock().await;
        while let Some(cmd) = rx.recv().await {
            match cmd {
                NodeCommand::Deploy { state, reply } => {
                    let _ = reply.send(self.deploy(state));
                }
                NodeCommand::Send {
                    message,
                    now,
                    reply,
                } => {
                    let result = match now {
                        Some(t) => self.send_message(message, t),
                        None => self.send_message_now(message),
                    };
                    if reply.send(result).is_err() {
                        debug!("submitter went away before its receipts");
                    }
                }
            }
        }
        info!("command channel closed, stopping");
    }

    fn wall_clock(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    // --- Query methods for RPC ---

    /// Current logical time.
    pub fn now(&self) -> Result<Timestamp, LockerError> {
        self.storage.read().clock()
    }

    pub fn vault_state(&self, vault: &Address) -> Result<VaultSnapshot, LockerError> {
        query::vault_state(&*self.storage.read(), vault)
    }

    pub fn sub_ledger_address(&self, vault: &Address, owner: &Address) -> Result<Address, LockerError> {
        query::sub_ledger_address(&*self.storage.read(), vault, owner)
    }

    pub fn unlocked_amount(&self, vault: &Address, t: Timestamp, amount: u64) -> Result<u64, LockerError> {
        query::unlocked_amount(&*self.storage.read(), vault, t, amount)
    }

    pub fn sub_ledger_state(
        &self,
        vault: &Address,
        owner: &Address,
    ) -> Result<Option<SubLedgerState>, LockerError> {
        query::sub_ledger_state(&*self.storage.read(), vault, owner)
    }

    pub fn amount_to_withdraw(
        &self,
        vault: &Address,
        now: Timestamp,
        last: Timestamp,
        deposit: u64,
    ) -> Result<u64, LockerError> {
        query::amount_to_withdraw(&*self.storage.read(), vault, now, last, deposit)
    }

    /// Every sub-ledger of one vault.
    pub fn sub_ledgers_of(&self, vault: &Address) -> Result<Vec<SubLedgerState>, LockerError> {
        self.storage.read().sub_ledgers_of(vault)
    }

    /// Value credited to an external account since startup.
    pub fn credited(&self, account: &Address) -> u64 {
        self.runtime.lock().credited(account)
    }

    /// Flush storage to disk.
    pub fn flush(&self) -> Result<(), LockerError> {
        self.storage.read().flush()
    }

    /// Node configuration reference.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use locker_core::command::Command;
    use locker_core::constants::COIN;
    use locker_core::schedule::VestingSchedule;

    const T: u64 = 1_685_889_892;
    const USER: Address = Address([0x11; 32]);

    fn temp_node() -> (Arc<Node>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig {
            data_dir: dir.path().to_path_buf(),
            ..NodeConfig::default()
        };
        (Node::open(config).unwrap(), dir)
    }

    fn vault_state() -> VaultState {
        VaultState::new(VestingSchedule::new(T + 100, T + 1000, 600, 60).unwrap())
    }

    #[test]
    fn deploy_and_query() {
        let (node, _dir) = temp_node();
        let vault = node.deploy(vault_state()).unwrap();
        let snap = node.vault_state(&vault).unwrap();
        assert_eq!(snap.total_locked, 0);
        assert_eq!(snap.deposit_window_end, T + 100);
    }

    #[test]
    fn receipts_are_broadcast() {
        let (node, _dir) = temp_node();
        let vault = node.deploy(vault_state()).unwrap();
        let mut rx = node.subscribe();
        node.send_message(Message::new(USER, vault, 50 * COIN, Command::Deposit.encode()), T)
            .unwrap();
        let first = rx.try_recv().unwrap();
        assert_eq!(first.message.to, vault);
        let second = rx.try_recv().unwrap();
        assert_eq!(second.message.to, node.sub_ledger_address(&vault, &USER).unwrap());
    }

    #[tokio::test]
    async fn command_loop_processes_submissions() {
        let (node, _dir) = temp_node();
        let vault = node.deploy(vault_state()).unwrap();
        let runner = Arc::clone(&node);
        tokio::spawn(async move { runner.run().await });

        let receipts = node
            .submit(Message::new(USER, vault, 50 * COIN, Command::Deposit.encode()), Some(T))
            .await
            .unwrap();
        assert_eq!(receipts.len(), 2);
        let state = node.sub_ledger_state(&vault, &USER).unwrap().unwrap();
        assert_eq!(state.total_deposited, 49 * COIN);
    }

    #[tokio::test]
    async fn deploy_through_command_channel() {
        let (node, _dir) = temp_node();
        let runner = Arc::clone(&node);
        tokio::spawn(async move { runner.run().await });

        let (reply, rx) = oneshot::channel();
        node.command_sender()
            .send(NodeCommand::Deploy {
                state: vault_state(),
                reply,
            })
            .await
            .unwrap();
        let vault = rx.await.unwrap().unwrap();
        assert!(node.vault_state(&vault).is_ok());
    }
}
