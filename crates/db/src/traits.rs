use hodlock_primitives::{buf::Hash160Buf, keys::KeyRef, outref::OutputRef};

use crate::{errors::DbResult, types::LockEntry};

/// Low-level keyed store for lock entries.
///
/// One entry per `(txid, vout)`; implementations must make
/// [`LockStore::insert_if_absent`] atomic per key so that duplicate
/// admission notifications racing each other cannot create two rows.
pub trait LockStore: Send + Sync + 'static {
    /// Inserts the entry unless one already exists under the same outpoint.
    /// Returns whether an insert happened.
    fn insert_if_absent(&self, entry: LockEntry) -> DbResult<bool>;

    /// Removes the entry. Returns whether one existed; removing a missing
    /// entry is not an error.
    fn remove(&self, outpoint: &OutputRef) -> DbResult<bool>;

    fn get(&self, outpoint: &OutputRef) -> DbResult<Option<LockEntry>>;

    /// Records the custodian key binding on an existing entry. Returns false
    /// if the entry is gone (spent or never admitted).
    fn set_key_ref(&self, outpoint: &OutputRef, key_ref: KeyRef) -> DbResult<bool>;

    /// Every outstanding entry.
    fn all(&self) -> DbResult<Vec<LockEntry>>;

    /// Entries owned by the given address hash.
    fn by_owner(&self, owner: &Hash160Buf) -> DbResult<Vec<LockEntry>>;

    /// All entries funded by the given transaction.
    fn by_txid(&self, txid: &[u8; 32]) -> DbResult<Vec<LockEntry>>;
}
