//! In-memory [`LockStore`] used by tests across the workspace.

use std::collections::BTreeMap;

use hodlock_primitives::{buf::Hash160Buf, keys::KeyRef, outref::OutputRef};
use parking_lot::RwLock;

use crate::{DbResult, LockEntry, LockStore};

/// BTreeMap-backed store with the same key ordering as the sled
/// implementation.
#[derive(Debug, Default)]
pub struct MemLockStore {
    entries: RwLock<BTreeMap<[u8; 36], LockEntry>>,
}

impl MemLockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LockStore for MemLockStore {
    fn insert_if_absent(&self, entry: LockEntry) -> DbResult<bool> {
        let mut entries = self.entries.write();
        let key = entry.outpoint().index_key();
        if entries.contains_key(&key) {
            return Ok(false);
        }
        entries.insert(key, entry);
        Ok(true)
    }

    fn remove(&self, outpoint: &OutputRef) -> DbResult<bool> {
        Ok(self.entries.write().remove(&outpoint.index_key()).is_some())
    }

    fn get(&self, outpoint: &OutputRef) -> DbResult<Option<LockEntry>> {
        Ok(self.entries.read().get(&outpoint.index_key()).cloned())
    }

    fn set_key_ref(&self, outpoint: &OutputRef, key_ref: KeyRef) -> DbResult<bool> {
        let mut entries = self.entries.write();
        match entries.get_mut(&outpoint.index_key()) {
            Some(entry) => {
                entry.set_key_ref(key_ref);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn all(&self) -> DbResult<Vec<LockEntry>> {
        Ok(self.entries.read().values().cloned().collect())
    }

    fn by_owner(&self, owner: &Hash160Buf) -> DbResult<Vec<LockEntry>> {
        Ok(self
            .entries
            .read()
            .values()
            .filter(|e| e.owner_hash() == owner)
            .cloned()
            .collect())
    }

    fn by_txid(&self, txid: &[u8; 32]) -> DbResult<Vec<LockEntry>> {
        Ok(self
            .entries
            .read()
            .values()
            .filter(|e| e.outpoint().txid_bytes() == txid)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use hodlock_contract::LockContract;

    use super::*;

    fn entry(txid_byte: u8, vout: u32, owner_byte: u8) -> LockEntry {
        let contract =
            LockContract::new(Hash160Buf::new([owner_byte; 20]), 100_000, vec![]).unwrap();
        LockEntry::new(
            OutputRef::from_raw([txid_byte; 32], vout),
            1000,
            vec![0xAB; 160],
            contract,
            vec![0xCD; 64],
            1_700_000_000,
        )
    }

    #[test]
    fn insert_is_first_writer_wins() {
        let store = MemLockStore::new();
        assert!(store.insert_if_absent(entry(1, 0, 1)).unwrap());
        assert!(!store.insert_if_absent(entry(1, 0, 2)).unwrap());
        // the original row survived
        let got = store
            .get(&OutputRef::from_raw([1; 32], 0))
            .unwrap()
            .unwrap();
        assert_eq!(got.owner_hash(), &Hash160Buf::new([1; 20]));
    }

    #[test]
    fn remove_missing_is_ok() {
        let store = MemLockStore::new();
        assert!(!store.remove(&OutputRef::from_raw([1; 32], 0)).unwrap());
    }

    #[test]
    fn secondary_lookups() {
        let store = MemLockStore::new();
        store.insert_if_absent(entry(1, 0, 7)).unwrap();
        store.insert_if_absent(entry(1, 1, 7)).unwrap();
        store.insert_if_absent(entry(2, 0, 8)).unwrap();

        assert_eq!(store.by_txid(&[1; 32]).unwrap().len(), 2);
        assert_eq!(
            store.by_owner(&Hash160Buf::new([7; 20])).unwrap().len(),
            2
        );
        assert_eq!(store.all().unwrap().len(), 3);
    }

    #[test]
    fn key_binding_updates_existing_only() {
        let store = MemLockStore::new();
        store.insert_if_absent(entry(3, 0, 1)).unwrap();
        let op = OutputRef::from_raw([3; 32], 0);
        assert!(store.set_key_ref(&op, KeyRef::for_key("k1")).unwrap());
        assert_eq!(
            store.get(&op).unwrap().unwrap().key_ref().unwrap().key_id(),
            "k1"
        );
        assert!(!store
            .set_key_ref(&OutputRef::from_raw([9; 32], 0), KeyRef::for_key("k2"))
            .unwrap());
    }
}
