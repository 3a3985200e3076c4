//! Sled-backed lock store.
//!
//! Two trees: the primary entry tree keyed by the fixed-width outpoint key,
//! and an owner index keyed by `owner_hash ++ outpoint_key` with empty
//! values. Mutations touch both trees inside one sled transaction so a crash
//! can never leave the index pointing at a missing entry.

use borsh::BorshDeserialize;
use hodlock_db::{DbError, DbResult, LockEntry, LockStore};
use hodlock_primitives::{buf::Hash160Buf, keys::KeyRef, outref::OutputRef};
use sled::{
    transaction::{ConflictableTransactionError, TransactionError},
    Transactional, Tree,
};

const ENTRY_TREE: &str = "lock_entries";
const OWNER_INDEX_TREE: &str = "lock_owner_index";

#[derive(Debug, Clone)]
pub struct SledLockStore {
    entries: Tree,
    owner_index: Tree,
}

impl SledLockStore {
    pub fn open(db: &sled::Db) -> DbResult<Self> {
        Ok(Self {
            entries: db.open_tree(ENTRY_TREE).map_err(backend)?,
            owner_index: db.open_tree(OWNER_INDEX_TREE).map_err(backend)?,
        })
    }
}

fn backend(e: sled::Error) -> DbError {
    DbError::Backend(e.to_string())
}

fn tx_backend(e: TransactionError<DbError>) -> DbError {
    match e {
        TransactionError::Abort(db) => db,
        TransactionError::Storage(e) => backend(e),
    }
}

fn decode_entry(raw: &[u8]) -> DbResult<LockEntry> {
    LockEntry::try_from_slice(raw).map_err(|e| DbError::Codec(e.to_string()))
}

fn encode_entry(entry: &LockEntry) -> DbResult<Vec<u8>> {
    borsh::to_vec(entry).map_err(|e| DbError::Codec(e.to_string()))
}

fn owner_index_key(owner: &Hash160Buf, outpoint: &OutputRef) -> [u8; 56] {
    let mut key = [0u8; 56];
    key[..20].copy_from_slice(owner.as_bytes());
    key[20..].copy_from_slice(&outpoint.index_key());
    key
}

impl LockStore for SledLockStore {
    fn insert_if_absent(&self, entry: LockEntry) -> DbResult<bool> {
        let key = entry.outpoint().index_key();
        let idx_key = owner_index_key(entry.owner_hash(), entry.outpoint());
        let value = encode_entry(&entry)?;

        (&self.entries, &self.owner_index)
            .transaction(move |(entries, owner_index)| {
                if entries.get(key)?.is_some() {
                    return Ok(false);
                }
                entries.insert(key.as_slice(), value.as_slice())?;
                owner_index.insert(idx_key.as_slice(), &[] as &[u8])?;
                Ok(true)
            })
            .map_err(tx_backend)
    }

    fn remove(&self, outpoint: &OutputRef) -> DbResult<bool> {
        let key = outpoint.index_key();
        (&self.entries, &self.owner_index)
            .transaction(move |(entries, owner_index)| {
                let Some(raw) = entries.remove(key.as_slice())? else {
                    return Ok(false);
                };
                let entry =
                    decode_entry(&raw).map_err(ConflictableTransactionError::Abort)?;
                let idx_key = owner_index_key(entry.owner_hash(), entry.outpoint());
                owner_index.remove(idx_key.as_slice())?;
                Ok(true)
            })
            .map_err(tx_backend)
    }

    fn get(&self, outpoint: &OutputRef) -> DbResult<Option<LockEntry>> {
        self.entries
            .get(outpoint.index_key())
            .map_err(backend)?
            .map(|raw| decode_entry(&raw))
            .transpose()
    }

    fn set_key_ref(&self, outpoint: &OutputRef, key_ref: KeyRef) -> DbResult<bool> {
        let key = outpoint.index_key();
        self.entries
            .transaction(move |entries| {
                let Some(raw) = entries.get(key)? else {
                    return Ok(false);
                };
                let mut entry =
                    decode_entry(&raw).map_err(ConflictableTransactionError::Abort)?;
                entry.set_key_ref(key_ref.clone());
                let value =
                    encode_entry(&entry).map_err(ConflictableTransactionError::Abort)?;
                entries.insert(key.as_slice(), value)?;
                Ok(true)
            })
            .map_err(tx_backend)
    }

    fn all(&self) -> DbResult<Vec<LockEntry>> {
        self.entries
            .iter()
            .map(|item| {
                let (_, raw) = item.map_err(backend)?;
                decode_entry(&raw)
            })
            .collect()
    }

    fn by_owner(&self, owner: &Hash160Buf) -> DbResult<Vec<LockEntry>> {
        let mut out = Vec::new();
        for item in self.owner_index.scan_prefix(owner.as_bytes()) {
            let (idx_key, _) = item.map_err(backend)?;
            // entry key is the index key's tail
            if let Some(raw) = self.entries.get(&idx_key[20..]).map_err(backend)? {
                out.push(decode_entry(&raw)?);
            }
        }
        Ok(out)
    }

    fn by_txid(&self, txid: &[u8; 32]) -> DbResult<Vec<LockEntry>> {
        self.entries
            .scan_prefix(txid)
            .map(|item| {
                let (_, raw) = item.map_err(backend)?;
                decode_entry(&raw)
            })
            .collect()
    }
}
