//! JSON-RPC server for the Locker node.
//!
//! Uses jsonrpsee 0.24 to expose the read-only vault queries plus vault
//! deployment and message submission. Addresses are 64-char hex strings.

use std::sync::Arc;

use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObjectOwned;
use serde::{Deserialize, Serialize};

use locker_core::error::LockerError;
use locker_core::schedule::VestingSchedule;
use locker_core::types::{Address, Message, SubLedgerInit, VaultSnapshot, VaultState};

use crate::node::Node;
use crate::runtime::{Outcome, Receipt};

/// JSON representation of a sub-ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubLedgerJson {
    pub total_deposited: u64,
    pub last_withdraw: u64,
}

/// Parameters of `sendmessage`.
///
/// Delivery time always comes from the node's clock; unknown fields such as
/// a caller-supplied `now` are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    /// Sender address as hex.
    pub from: String,
    /// Destination address as hex.
    pub to: String,
    /// Attached value in units.
    pub value: u64,
    /// Wire body as hex. Empty for a plain transfer.
    #[serde(default)]
    pub body: String,
    /// Sub-ledger init `(vault, owner)`, both hex.
    #[serde(default)]
    pub init: Option<(String, String)>,
}

/// JSON representation of a receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptJson {
    pub seq: u64,
    pub at: u64,
    pub from: String,
    pub to: String,
    pub value: u64,
    /// "applied", "aborted" or "credited".
    pub outcome: String,
    /// Set for aborted deliveries.
    pub exit_code: Option<u32>,
    pub error: Option<String>,
    /// Messages queued by an applied delivery.
    pub sent: usize,
}

impl From<&Receipt> for ReceiptJson {
    fn from(r: &Receipt) -> Self {
        let (outcome, exit_code, error, sent) = match &r.outcome {
            Outcome::Applied { sent } => ("applied", None, None, sent.len()),
            Outcome::Aborted(e) => ("aborted", Some(e.exit_code()), Some(e.to_string()), 0),
            Outcome::Credited => ("credited", None, None, 0),
        };
        Self {
            seq: r.seq,
            at: r.at,
            from: r.message.from.to_string(),
            to: r.message.to.to_string(),
            value: r.message.value,
            outcome: outcome.to_string(),
            exit_code,
            error,
            sent,
        }
    }
}

/// Parse a 64-character hex string into an Address.
pub fn parse_address(hex_str: &str) -> Result<Address, ErrorObjectOwned> {
    Address::from_hex(hex_str).map_err(|e| rpc_error(-1, &e.to_string()))
}

/// Create a JSON-RPC error.
fn rpc_error(code: i32, msg: &str) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(code, msg.to_string(), None::<()>)
}

/// Map a node error onto an RPC error code.
fn locker_error(e: LockerError) -> ErrorObjectOwned {
    let code = match &e {
        LockerError::UnknownVault(_) => -5,
        LockerError::Config(_) | LockerError::ClockRegression { .. } => -8,
        LockerError::AlreadyDeployed(_) => -27,
        LockerError::Protocol(_) | LockerError::Storage(_) => -1,
    };
    rpc_error(code, &e.to_string())
}

/// The Locker JSON-RPC interface.
#[rpc(server)]
pub trait LockerRpc {
    /// Returns totals and schedule of a vault.
    #[method(name = "getvaultstate")]
    async fn get_vault_state(&self, vault: String) -> Result<VaultSnapshot, ErrorObjectOwned>;

    /// Returns the deterministic sub-ledger address for an owner.
    #[method(name = "getsubledgeraddress")]
    async fn get_sub_ledger_address(
        &self,
        vault: String,
        owner: String,
    ) -> Result<String, ErrorObjectOwned>;

    /// Returns the portion of `amount` unlocked at `t`.
    #[method(name = "getunlockedamount")]
    async fn get_unlocked_amount(
        &self,
        vault: String,
        t: u64,
        amount: u64,
    ) -> Result<u64, ErrorObjectOwned>;

    /// Returns a sub-ledger's figures.
    #[method(name = "getsubledgerstate")]
    async fn get_sub_ledger_state(
        &self,
        vault: String,
        owner: String,
    ) -> Result<SubLedgerJson, ErrorObjectOwned>;

    /// Returns the payout a settlement with these figures would produce.
    #[method(name = "getamounttowithdraw")]
    async fn get_amount_to_withdraw(
        &self,
        vault: String,
        now: u64,
        last: u64,
        deposit: u64,
    ) -> Result<u64, ErrorObjectOwned>;

    /// Deploys a vault with the given schedule and returns its address.
    #[method(name = "deployvault")]
    async fn deploy_vault(
        &self,
        deposit_window_end: u64,
        vesting_start: u64,
        vesting_duration: u64,
        unlock_period: u64,
    ) -> Result<String, ErrorObjectOwned>;

    /// Submits a message and returns the receipts of everything it triggered.
    #[method(name = "sendmessage")]
    async fn send_message(
        &self,
        request: SendMessageRequest,
    ) -> Result<Vec<ReceiptJson>, ErrorObjectOwned>;
}

/// Implementation of the Locker JSON-RPC server.
pub struct RpcServerImpl {
    node: Arc<Node>,
}

impl RpcServerImpl {
    /// Create a new RPC server implementation wrapping the given node.
    pub fn new(node: Arc<Node>) -> Self {
        Self { node }
    }
}

#[async_trait]
impl LockerRpcServer for RpcServerImpl {
    async fn get_vault_state(&self, vault: String) -> Result<VaultSnapshot, ErrorObjectOwned> {
        let vault = parse_address(&vault)?;
        self.node.vault_state(&vault).map_err(locker_error)
    }

    async fn get_sub_ledger_address(
        &self,
        vault: String,
        owner: String,
    ) -> Result<String, ErrorObjectOwned> {
        let vault = parse_address(&vault)?;
        let owner = parse_address(&owner)?;
        let address = self
            .node
            .sub_ledger_address(&vault, &owner)
            .map_err(locker_error)?;
        Ok(address.to_string())
    }

    async fn get_unlocked_amount(
        &self,
        vault: String,
        t: u64,
        amount: u64,
    ) -> Result<u64, ErrorObjectOwned> {
        let vault = parse_address(&vault)?;
        self.node
            .unlocked_amount(&vault, t, amount)
            .map_err(locker_error)
    }

    async fn get_sub_ledger_state(
        &self,
        vault: String,
        owner: String,
    ) -> Result<SubLedgerJson, ErrorObjectOwned> {
        let vault = parse_address(&vault)?;
        let owner = parse_address(&owner)?;
        let state = self
            .node
            .sub_ledger_state(&vault, &owner)
            .map_err(locker_error)?
            .ok_or_else(|| rpc_error(-5, "sub-ledger not found"))?;
        Ok(SubLedgerJson {
            total_deposited: state.total_deposited,
            last_withdraw: state.last_withdraw,
        })
    }

    async fn get_amount_to_withdraw(
        &self,
        vault: String,
        now: u64,
        last: u64,
        deposit: u64,
    ) -> Result<u64, ErrorObjectOwned> {
        let vault = parse_address(&vault)?;
        self.node
            .amount_to_withdraw(&vault, now, last, deposit)
            .map_err(locker_error)
    }

    async fn deploy_vault(
        &self,
        deposit_window_end: u64,
        vesting_start: u64,
        vesting_duration: u64,
        unlock_period: u64,
    ) -> Result<String, ErrorObjectOwned> {
        let schedule =
            VestingSchedule::new(deposit_window_end, vesting_start, vesting_duration, unlock_period)
                .map_err(|e| locker_error(e.into()))?;
        let address = self
            .node
            .deploy(VaultState::new(schedule))
            .map_err(locker_error)?;
        Ok(address.to_string())
    }

    async fn send_message(
        &self,
        request: SendMessageRequest,
    ) -> Result<Vec<ReceiptJson>, ErrorObjectOwned> {
        let message = build_message(&request)?;
        let receipts = self
            .node
            .send_message_now(message)
            .map_err(locker_error)?;
        Ok(receipts.iter().map(ReceiptJson::from).collect())
    }
}

fn build_message(request: &SendMessageRequest) -> Result<Message, ErrorObjectOwned> {
    let from = parse_address(&request.from)?;
    let to = parse_address(&request.to)?;
    let body = hex::decode(&request.body).map_err(|_| rpc_error(-22, "invalid hex in body"))?;
    let mut message = Message::new(from, to, request.value, body);
    if let Some((vault, owner)) = &request.init {
        message = message.with_init(SubLedgerInit {
            vault: parse_address(vault)?,
            owner: parse_address(owner)?,
        });
    }
    Ok(message)
}

/// Start the JSON-RPC server on the given address.
pub async fn start_rpc_server(addr: &str, node: Arc<Node>) -> Result<ServerHandle, LockerError> {
    let server = Server::builder()
        .build(addr)
        .await
        .map_err(|e| LockerError::Storage(format!("RPC server error: {e}")))?;

    let rpc_impl = RpcServerImpl::new(node);
    let handle = server.start(rpc_impl.into_rpc());

    Ok(handle)
}
