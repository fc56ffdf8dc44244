//! Actor host: mailboxes, logical clock, and state-then-send commit.
//!
//! Every actor address owns a FIFO mailbox. [`Runtime::step`] takes the next
//! actor in round-robin order and delivers exactly one message to it, so one
//! actor's messages stay in arrival order while different actors interleave.
//!
//! Delivery runs under the store write lock: the handler sees the committed
//! state, its successor is written, and only then are outbound messages
//! queued. An abort writes and sends nothing. A storage failure leaves the
//! message at the head of its mailbox for the next step.
//!
//! Messages entering through [`Runtime::submit`] are external. An external
//! message may not name a hosted actor as its sender: a deployed vault, the
//! sub-ledger its `init` derives to, or the sub-ledger of the owner a
//! settlement claims. Such messages abort with
//! [`ProtocolError::ForgedOrigin`]. Only messages emitted by handlers carry
//! an actor's address as `from`.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use locker_core::address::{derive_sub_ledger_address, vault_address, SubLedgerKey};
use locker_core::command::{ActorKind, Command};
use locker_core::error::{LockerError, ProtocolError};
use locker_core::fees::FeeSchedule;
use locker_core::store::LedgerStore;
use locker_core::sub_ledger::SubLedger;
use locker_core::types::{Address, Message, SubLedgerInit, Timestamp, VaultState};
use locker_core::vault::Vault;

/// What happened to one delivered message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The handler committed; these messages were queued.
    Applied { sent: Vec<Message> },
    /// The handler aborted; nothing was written or sent.
    Aborted(ProtocolError),
    /// Destination is an external account; the value was credited to it.
    Credited,
}

/// Record of one processed message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    /// Delivery sequence number, starting at 1.
    pub seq: u64,
    /// Logical time of delivery.
    pub at: Timestamp,
    pub message: Message,
    pub outcome: Outcome,
}

impl Receipt {
    pub fn is_aborted(&self) -> bool {
        matches!(self.outcome, Outcome::Aborted(_))
    }

    /// Exit code of an aborted delivery, `None` otherwise.
    pub fn exit_code(&self) -> Option<u32> {
        match &self.outcome {
            Outcome::Aborted(e) => Some(e.exit_code()),
            _ => None,
        }
    }
}

/// Where a queued message came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Origin {
    /// Submitted by a caller outside the runtime.
    External,
    /// Emitted by a hosted actor's handler.
    Internal,
}

struct Envelope {
    msg: Message,
    origin: Origin,
}

enum Route {
    Vault(VaultState),
    SubLedger(SubLedgerInit),
    External,
}

/// Hosts every vault and sub-ledger over one store.
pub struct Runtime<S: LedgerStore> {
    store: Arc<RwLock<S>>,
    fees: FeeSchedule,
    mailboxes: HashMap<Address, VecDeque<Envelope>>,
    /// Actors with pending mail, in service order.
    ready: VecDeque<Address>,
    /// Value delivered to external accounts since startup. Diagnostic only:
    /// not persisted, never pruned, and not consulted by any handler.
    credits: HashMap<Address, u64>,
    seq: u64,
}

impl<S: LedgerStore> Runtime<S> {
    pub fn new(store: Arc<RwLock<S>>, fees: FeeSchedule) -> Self {
        Self {
            store,
            fees,
            mailboxes: HashMap::new(),
            ready: VecDeque::new(),
            credits: HashMap::new(),
            seq: 0,
        }
    }

    /// Shared handle to the underlying store.
    pub fn store(&self) -> &Arc<RwLock<S>> {
        &self.store
    }

    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    /// Store `state` at its derived vault address.
    pub fn deploy(&mut self, state: VaultState) -> Result<Address, LockerError> {
        state.schedule.validate()?;
        let address = vault_address(&state);
        let mut store = self.store.write();
        if store.contains_vault(&address)? {
            return Err(LockerError::AlreadyDeployed(address));
        }
        store.put_vault(&address, &state)?;
        info!(
            vault = %address,
            deposit_window_end = state.schedule.deposit_window_end,
            vesting_start = state.schedule.vesting_start,
            "deployed vault"
        );
        Ok(address)
    }

    /// Current logical time.
    pub fn now(&self) -> Result<Timestamp, LockerError> {
        self.store.read().clock()
    }

    /// Move the logical clock to `now`. Going backwards is an error.
    pub fn advance_clock(&mut self, now: Timestamp) -> Result<(), LockerError> {
        let mut store = self.store.write();
        let current = store.clock()?;
        if now < current {
            return Err(LockerError::ClockRegression { now, current });
        }
        if now > current {
            store.set_clock(now)?;
        }
        Ok(())
    }

    /// Queue a message from an outside caller.
    pub fn submit(&mut self, msg: Message) {
        self.enqueue(Envelope {
            msg,
            origin: Origin::External,
        });
    }

    fn enqueue(&mut self, env: Envelope) {
        let to = env.msg.to;
        let queue = self.mailboxes.entry(to).or_default();
        if queue.is_empty() {
            self.ready.push_back(to);
        }
        queue.push_back(env);
    }

    /// Put `env` back at the head of `actor`'s mailbox and serve it next.
    fn requeue(&mut self, actor: Address, env: Envelope) {
        self.mailboxes.entry(actor).or_default().push_front(env);
        self.ready.retain(|a| *a != actor);
        self.ready.push_front(actor);
    }

    /// Messages waiting in all mailboxes.
    pub fn pending(&self) -> usize {
        self.mailboxes.values().map(VecDeque::len).sum()
    }

    /// Total value credited to an external account.
    pub fn credited(&self, account: &Address) -> u64 {
        self.credits.get(account).copied().unwrap_or(0)
    }

    /// Deliver one message. Returns `None` when every mailbox is empty.
    pub fn step(&mut self) -> Result<Option<Receipt>, LockerError> {
        loop {
            let Some(actor) = self.ready.pop_front() else {
                return Ok(None);
            };
            let Some(queue) = self.mailboxes.get_mut(&actor) else {
                continue;
            };
            let Some(env) = queue.pop_front() else {
                self.mailboxes.remove(&actor);
                continue;
            };
            if queue.is_empty() {
                self.mailboxes.remove(&actor);
            } else {
                self.ready.push_back(actor);
            }

            let receipt = match self.deliver(&env) {
                Ok(receipt) => receipt,
                Err(e) => {
                    warn!(to = %actor, "delivery failed, message kept: {e}");
                    self.requeue(actor, env);
                    return Err(e);
                }
            };
            if let Outcome::Applied { sent } = &receipt.outcome {
                for out in sent.iter().cloned() {
                    self.enqueue(Envelope {
                        msg: out,
                        origin: Origin::Internal,
                    });
                }
            }
            return Ok(Some(receipt));
        }
    }

    /// Deliver until every mailbox is empty.
    pub fn run_until_idle(&mut self) -> Result<Vec<Receipt>, LockerError> {
        let mut receipts = Vec::new();
        while let Some(receipt) = self.step()? {
            receipts.push(receipt);
        }
        Ok(receipts)
    }

    /// Advance the clock to `now`, submit `msg`, and run to quiescence.
    pub fn send(&mut self, msg: Message, now: Timestamp) -> Result<Vec<Receipt>, LockerError> {
        self.advance_clock(now)?;
        self.submit(msg);
        self.run_until_idle()
    }

    fn route(store: &S, msg: &Message) -> Result<Route, LockerError> {
        if let Some(state) = store.get_vault(&msg.to)? {
            return Ok(Route::Vault(state));
        }
        if let Some(init) = msg.init {
            if let Some(vault) = store.get_vault(&init.vault)? {
                let derived =
                    derive_sub_ledger_address(&init.vault, &init.owner, &vault.sub_ledger_template);
                if derived == msg.to {
                    return Ok(Route::SubLedger(init));
                }
            }
        }
        Ok(Route::External)
    }

    /// Whether an external `msg` claims to come from a hosted actor.
    fn forged_origin(store: &S, msg: &Message) -> Result<bool, LockerError> {
        if store.contains_vault(&msg.from)? {
            return Ok(true);
        }
        if let Some(init) = msg.init {
            if let Some(vault) = store.get_vault(&init.vault)? {
                let derived =
                    derive_sub_ledger_address(&init.vault, &init.owner, &vault.sub_ledger_template);
                if derived == msg.from {
                    return Ok(true);
                }
            }
        }
        if let Some(vault) = store.get_vault(&msg.to)? {
            if let Ok(Command::WithdrawSettlement { owner, .. }) =
                Command::decode(&msg.body, ActorKind::Vault)
            {
                let derived = derive_sub_ledger_address(&msg.to, &owner, &vault.sub_ledger_template);
                if derived == msg.from {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn deliver(&mut self, env: &Envelope) -> Result<Receipt, LockerError> {
        let msg = &env.msg;
        let (now, outcome) = {
            let mut store = self.store.write();
            let now = store.clock()?;
            if env.origin == Origin::External && Self::forged_origin(&store, msg)? {
                let outcome = Outcome::Aborted(ProtocolError::ForgedOrigin(msg.from));
                drop(store);
                return Ok(self.record(msg, now, outcome));
            }
            let outcome = match Self::route(&store, msg)? {
                Route::Vault(state) => {
                    let vault = Vault::new(msg.to, self.fees);
                    match vault.handle(&state, msg, now) {
                        Ok(tr) => {
                            store.put_vault(&msg.to, &tr.state)?;
                            Outcome::Applied { sent: tr.outbound }
                        }
                        Err(e) => Outcome::Aborted(e),
                    }
                }
                Route::SubLedger(init) => {
                    let key = SubLedgerKey::new(init.vault, init.owner);
                    let current = store.get_sub_ledger(&key)?;
                    let ledger = SubLedger::new(msg.to, init, self.fees);
                    match ledger.handle(current.as_ref(), msg, now) {
                        Ok(tr) => {
                            store.put_sub_ledger(&key, &tr.state)?;
                            Outcome::Applied { sent: tr.outbound }
                        }
                        Err(e) => Outcome::Aborted(e),
                    }
                }
                Route::External => Outcome::Credited,
            };
            (now, outcome)
        };
        Ok(self.record(msg, now, outcome))
    }

    /// Credit external value, log, and number the receipt.
    fn record(&mut self, msg: &Message, now: Timestamp, outcome: Outcome) -> Receipt {
        if matches!(outcome, Outcome::Credited) {
            let balance = self.credits.entry(msg.to).or_insert(0);
            *balance = balance.saturating_add(msg.value);
        }

        self.seq += 1;
        match &outcome {
            Outcome::Applied { sent } => debug!(
                seq = self.seq,
                from = %msg.from,
                to = %msg.to,
                value = msg.value,
                sent = sent.len(),
                "applied message"
            ),
            Outcome::Aborted(e) => warn!(
                seq = self.seq,
                from = %msg.from,
                to = %msg.to,
                exit_code = e.exit_code(),
                "aborted message: {e}"
            ),
            Outcome::Credited => debug!(
                seq = self.seq,
                to = %msg.to,
                value = msg.value,
                "credited external account"
            ),
        }

        Receipt {
            seq: self.seq,
            at: now,
            message: msg.clone(),
            outcome,
        }
    }
}
