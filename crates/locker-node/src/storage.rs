//! RocksDB-backed persistent actor state.
//!
//! Implements [`LedgerStore`] using column families for vault states,
//! sub-ledger states, and metadata. Each put that creates a new key bumps its
//! counter in the same [`WriteBatch`].

use std::path::Path;

use rocksdb::{ColumnFamilyDescriptor, Options, SliceTransform, WriteBatch, DB};

use locker_core::address::SubLedgerKey;
use locker_core::error::LockerError;
use locker_core::store::LedgerStore;
use locker_core::types::{Address, SubLedgerState, Timestamp, VaultState};

// --- Column family names ---

const CF_VAULTS: &str = "vaults";
const CF_SUB_LEDGERS: &str = "sub_ledgers";
const CF_METADATA: &str = "metadata";

/// All column family names.
const ALL_CFS: &[&str] = &[CF_VAULTS, CF_SUB_LEDGERS, CF_METADATA];

// --- Metadata keys ---

const META_VAULT_COUNT: &[u8] = b"vault_count";
const META_SUB_LEDGER_COUNT: &[u8] = b"sub_ledger_count";
const META_CLOCK: &[u8] = b"clock";

/// RocksDB-backed actor state storage.
///
/// Sub-ledger keys are `vault ‖ owner`; a 32-byte prefix extractor lets
/// [`sub_ledgers_of`](LedgerStore::sub_ledgers_of) scan one vault.
pub struct RocksStore {
    db: DB,
}

impl RocksStore {
    /// Open or create a RocksDB database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LockerError> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| {
                let mut opts = Options::default();
                if *name == CF_SUB_LEDGERS {
                    opts.set_prefix_extractor(SliceTransform::create_fixed_prefix(32));
                }
                ColumnFamilyDescriptor::new(*name, opts)
            })
            .collect();

        let db = DB::open_cf_descriptors(&db_opts, path.as_ref(), cf_descriptors)
            .map_err(|e| LockerError::Storage(e.to_string()))?;

        Ok(Self { db })
    }

    /// Flush all in-memory buffers to disk.
    pub fn flush(&self) -> Result<(), LockerError> {
        self.db
            .flush()
            .map_err(|e| LockerError::Storage(e.to_string()))
    }

    /// Trigger manual compaction across all column families.
    pub fn compact(&self) -> Result<(), LockerError> {
        for cf_name in ALL_CFS {
            let cf = self.cf_handle(cf_name)?;
            self.db.compact_range_cf(cf, None::<&[u8]>, None::<&[u8]>);
        }
        Ok(())
    }

    fn cf_handle(&self, name: &str) -> Result<&rocksdb::ColumnFamily, LockerError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| LockerError::Storage(format!("missing column family: {name}")))
    }

    fn get_meta_u64(&self, key: &[u8]) -> Result<u64, LockerError> {
        let cf = self.cf_handle(CF_METADATA)?;
        match self
            .db
            .get_cf(cf, key)
            .map_err(|e| LockerError::Storage(e.to_string()))?
        {
            Some(bytes) => {
                let arr: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| LockerError::Storage("invalid metadata value length".into()))?;
                Ok(u64::from_le_bytes(arr))
            }
            None => Ok(0),
        }
    }

    fn encode<T: bincode::Encode>(value: &T) -> Result<Vec<u8>, LockerError> {
        bincode::encode_to_vec(value, bincode::config::standard())
            .map_err(|e| LockerError::Storage(e.to_string()))
    }

    fn decode<T: bincode::Decode<()>>(bytes: &[u8]) -> Result<T, LockerError> {
        let (value, _) = bincode::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| LockerError::Storage(e.to_string()))?;
        Ok(value)
    }

    /// Write `value` under `key` in `cf_name`, bumping `counter` if the key is new.
    fn put_counted(
        &self,
        cf_name: &str,
        key: &[u8],
        value: Vec<u8>,
        counter: &[u8],
    ) -> Result<(), LockerError> {
        let cf = self.cf_handle(cf_name)?;
        let is_new = self
            .db
            .get_cf(cf, key)
            .map_err(|e| LockerError::Storage(e.to_string()))?
            .is_none();

        let mut batch = WriteBatch::default();
        batch.put_cf(cf, key, value);
        if is_new {
            let count = self.get_meta_u64(counter)?.saturating_add(1);
            batch.put_cf(self.cf_handle(CF_METADATA)?, counter, count.to_le_bytes());
        }
        self.db
            .write(batch)
            .map_err(|e| LockerError::Storage(e.to_string()))
    }
}

impl LedgerStore for RocksStore {
    fn get_vault(&self, vault: &Address) -> Result<Option<VaultState>, LockerError> {
        let cf = self.cf_handle(CF_VAULTS)?;
        match self
            .db
            .get_cf(cf, vault.as_bytes())
            .map_err(|e| LockerError::Storage(e.to_string()))?
        {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_vault(&mut self, vault: &Address, state: &VaultState) -> Result<(), LockerError> {
        let value = Self::encode(state)?;
        self.put_counted(CF_VAULTS, vault.as_bytes(), value, META_VAULT_COUNT)
    }

    fn get_sub_ledger(&self, key: &SubLedgerKey) -> Result<Option<SubLedgerState>, LockerError> {
        let cf = self.cf_handle(CF_SUB_LEDGERS)?;
        match self
            .db
            .get_cf(cf, key.to_bytes())
            .map_err(|e| LockerError::Storage(e.to_string()))?
        {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_sub_ledger(
        &mut self,
        key: &SubLedgerKey,
        state: &SubLedgerState,
    ) -> Result<(), LockerError> {
        let value = Self::encode(state)?;
        self.put_counted(CF_SUB_LEDGERS, &key.to_bytes(), value, META_SUB_LEDGER_COUNT)
    }

    fn sub_ledgers_of(&self, vault: &Address) -> Result<Vec<SubLedgerState>, LockerError> {
        let cf = self.cf_handle(CF_SUB_LEDGERS)?;
        let prefix = vault.as_bytes();
        let mut out = Vec::new();

        for item in self.db.prefix_iterator_cf(cf, prefix) {
            let (key_bytes, value_bytes) =
                item.map_err(|e| LockerError::Storage(e.to_string()))?;
            // prefix_iterator may run past the prefix
            if key_bytes.len() != 64 || &key_bytes[..32] != prefix {
                break;
            }
            out.push(Self::decode(&value_bytes)?);
        }
        Ok(out)
    }

    fn vault_count(&self) -> Result<u64, LockerError> {
        self.get_meta_u64(META_VAULT_COUNT)
    }

    fn sub_ledger_count(&self) -> Result<u64, LockerError> {
        self.get_meta_u64(META_SUB_LEDGER_COUNT)
    }

    fn clock(&self) -> Result<Timestamp, LockerError> {
        self.get_meta_u64(META_CLOCK)
    }

    fn set_clock(&mut self, now: Timestamp) -> Result<(), LockerError> {
        let cf = self.cf_handle(CF_METADATA)?;
        self.db
            .put_cf(cf, META_CLOCK, now.to_le_bytes())
            .map_err(|e| LockerError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use locker_core::schedule::VestingSchedule;

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Create a temporary RocksStore.
    fn temp_store() -> (RocksStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksStore::open(dir.path().join("lockerdata")).unwrap();
        (store, dir)
    }

    fn vault_state() -> VaultState {
        VaultState::new(VestingSchedule::new(100, 1000, 600, 60).unwrap())
    }

    // ------------------------------------------------------------------
    // Vaults
    // ------------------------------------------------------------------

    #[test]
    fn fresh_store_is_empty() {
        let (store, _dir) = temp_store();
        assert_eq!(store.vault_count().unwrap(), 0);
        assert_eq!(store.sub_ledger_count().unwrap(), 0);
        assert_eq!(store.clock().unwrap(), 0);
        assert_eq!(store.get_vault(&Address([1; 32])).unwrap(), None);
    }

    #[test]
    fn vault_put_get() {
        let (mut store, _dir) = temp_store();
        let addr = Address([1; 32]);
        let mut state = vault_state();
        store.put_vault(&addr, &state).unwrap();
        state.total_locked = 49;
        store.put_vault(&addr, &state).unwrap();
        assert_eq!(store.get_vault(&addr).unwrap(), Some(state));
        assert_eq!(store.vault_count().unwrap(), 1);
    }

    // ------------------------------------------------------------------
    // Sub-ledgers
    // ------------------------------------------------------------------

    #[test]
    fn sub_ledger_prefix_scan() {
        let (mut store, _dir) = temp_store();
        let v1 = Address([1; 32]);
        let v2 = Address([2; 32]);
        for (vault, owner) in [(v1, 3u8), (v2, 4), (v1, 5), (v2, 6)] {
            let owner = Address([owner; 32]);
            store
                .put_sub_ledger(&SubLedgerKey::new(vault, owner), &SubLedgerState::new(vault, owner))
                .unwrap();
        }
        let of_v1 = store.sub_ledgers_of(&v1).unwrap();
        assert_eq!(of_v1.len(), 2);
        assert!(of_v1.iter().all(|s| s.vault == v1));
        assert_eq!(store.sub_ledgers_of(&Address([9; 32])).unwrap().len(), 0);
        assert_eq!(store.sub_ledger_count().unwrap(), 4);
    }

    #[test]
    fn sub_ledger_overwrite_keeps_count() {
        let (mut store, _dir) = temp_store();
        let key = SubLedgerKey::new(Address([1; 32]), Address([2; 32]));
        let mut s = SubLedgerState::new(key.vault, key.owner);
        store.put_sub_ledger(&key, &s).unwrap();
        s.total_deposited = 98;
        s.last_withdraw = 1060;
        store.put_sub_ledger(&key, &s).unwrap();
        assert_eq!(store.sub_ledger_count().unwrap(), 1);
        assert_eq!(store.get_sub_ledger(&key).unwrap(), Some(s));
    }

    // ------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------

    #[test]
    fn flush_and_compact() {
        let (mut store, _dir) = temp_store();
        store.put_vault(&Address([1; 32]), &vault_state()).unwrap();
        store.set_clock(42).unwrap();
        store.flush().unwrap();
        store.compact().unwrap();
        assert_eq!(store.clock().unwrap(), 42);
    }
}
