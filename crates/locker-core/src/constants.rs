//! Protocol constants. All monetary values in units (1 COIN = 10^9 units).

pub const COIN: u64 = 1_000_000_000;

/// Fixed deduction applied to every deposit and reward contribution.
pub const DEFAULT_FEE: u64 = COIN;

/// A deposit must carry strictly more than this value.
///
/// Observed boundary: a deposit of twice the fee is rejected, fifty coins are
/// accepted.
pub const DEFAULT_MIN_DEPOSIT_VALUE: u64 = 2 * COIN;

/// A reward contribution must carry strictly more than this value.
pub const DEFAULT_MIN_REWARD_VALUE: u64 = 2 * COIN;

/// A withdraw request must carry at least this much gas.
pub const DEFAULT_MIN_WITHDRAW_GAS: u64 = COIN;

/// Gas consumed by each relayed hop of the withdraw round-trip.
pub const DEFAULT_RELAY_FEE: u64 = COIN / 100;

// --- Wire opcodes ---

/// Text command header. The body tail is a one-byte command tag.
pub const OP_TEXT_COMMAND: u32 = 0;

/// Vault to sub-ledger: credit a net deposit.
pub const OP_DEPOSIT_FORWARD: u32 = 0x6465_7066;

/// Sub-ledger to vault: report figures for a pending withdrawal.
pub const OP_WITHDRAW_SETTLEMENT: u32 = 0x7773_746c;

/// Text tag for a reward contribution.
pub const TAG_REWARD: u8 = b'r';

/// Text tag for a deposit.
pub const TAG_DEPOSIT: u8 = b'd';

/// Text tag for a withdraw request (at the vault) or query (at a sub-ledger).
pub const TAG_WITHDRAW: u8 = b'w';

// --- Address derivation domains ---

/// Domain separator for sub-ledger address derivation.
pub const SUB_LEDGER_DOMAIN: &str = "locker/sub-ledger/v1";

/// Domain separator for vault address derivation.
pub const VAULT_DOMAIN: &str = "locker/vault/v1";

/// Identifier of the sub-ledger code version; its hash is the default
/// template mixed into sub-ledger addresses.
pub const SUB_LEDGER_CODE_ID: &[u8] = b"locker-sub-ledger-1";
