use std::sync::Arc;

use hodlock_db::{DbError, LockEntry, LockStore};
use hodlock_primitives::{buf::Hash160Buf, keys::KeyRef, outref::OutputRef};
use thiserror::Error;
use tracing::*;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("registry worker went away")]
    WorkerGone,
}

type Result<T> = std::result::Result<T, RegistryError>;

/// Index of currently-outstanding locks, keyed by outpoint with a secondary
/// owner lookup. Driven by overlay lifecycle notifications on one side and
/// scanned by the watchman on the other; per-key atomicity is delegated to
/// the store so a spent notification racing a maturity scan resolves to a
/// single winner.
#[derive(Clone)]
pub struct LockRegistry {
    store: Arc<dyn LockStore>,
}

impl std::fmt::Debug for LockRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockRegistry").finish_non_exhaustive()
    }
}

impl LockRegistry {
    pub fn new(store: Arc<dyn LockStore>) -> Self {
        Self { store }
    }

    /// Records a newly admitted output. Duplicate notifications for an
    /// outpoint already on file are detected and dropped.
    pub fn on_admitted(&self, entry: LockEntry) -> Result<bool> {
        let outpoint = *entry.outpoint();
        let inserted = self.store.insert_if_absent(entry)?;
        if inserted {
            info!(%outpoint, "lock admitted to registry");
        } else {
            warn!(%outpoint, "duplicate admission notification, keeping existing entry");
        }
        Ok(inserted)
    }

    /// Drops the entry for a spent output. Missing entries are fine: either
    /// we already processed the spend or the output was never ours.
    pub fn on_spent(&self, outpoint: &OutputRef) -> Result<bool> {
        let removed = self.store.remove(outpoint)?;
        if removed {
            info!(%outpoint, "lock spent, removed from registry");
        } else {
            debug!(%outpoint, "spend notification for unknown outpoint");
        }
        Ok(removed)
    }

    /// Drops an entry the overlay retracted (reorged away or evicted).
    pub fn on_deleted(&self, outpoint: &OutputRef) -> Result<bool> {
        let removed = self.store.remove(outpoint)?;
        if removed {
            info!(%outpoint, "lock deleted by overlay, removed from registry");
        } else {
            debug!(%outpoint, "delete notification for unknown outpoint");
        }
        Ok(removed)
    }

    /// Records which custodian key can redeem this lock. Only meaningful for
    /// locks this service's operator created.
    pub fn bind_key(&self, outpoint: &OutputRef, key_ref: KeyRef) -> Result<bool> {
        let bound = self.store.set_key_ref(outpoint, key_ref)?;
        if !bound {
            warn!(%outpoint, "key binding for unknown outpoint ignored");
        }
        Ok(bound)
    }

    pub fn find_all(&self) -> Result<Vec<LockEntry>> {
        Ok(self.store.all()?)
    }

    pub fn find_by_owner(&self, owner: &Hash160Buf) -> Result<Vec<LockEntry>> {
        Ok(self.store.by_owner(owner)?)
    }

    /// Entries funded by a transaction; narrowed to one output when `vout`
    /// is given.
    pub fn find_by_txid(
        &self,
        txid: &[u8; 32],
        vout: Option<u32>,
    ) -> Result<Vec<LockEntry>> {
        let entries = self.store.by_txid(txid)?;
        Ok(match vout {
            Some(v) => entries
                .into_iter()
                .filter(|e| e.outpoint().vout() == v)
                .collect(),
            None => entries,
        })
    }

    pub fn get(&self, outpoint: &OutputRef) -> Result<Option<LockEntry>> {
        Ok(self.store.get(outpoint)?)
    }

    /// Every entry whose lock window has passed at the given height.
    pub fn matured(&self, height: u32) -> Result<Vec<LockEntry>> {
        Ok(self
            .store
            .all()?
            .into_iter()
            .filter(|e| e.contract().is_matured_at(height))
            .collect())
    }

    /// Listing helper for UI consumers: each outstanding lock with the
    /// number of blocks left until it matures (zero once redeemable).
    pub fn remaining_blocks(&self, height: u32) -> Result<Vec<(LockEntry, u32)>> {
        Ok(self
            .store
            .all()?
            .into_iter()
            .map(|e| {
                let left = e.contract().lock_until_height().saturating_sub(height);
                (e, left)
            })
            .collect())
    }

    /// Async shims for callers on the runtime; store work runs on the
    /// blocking pool.
    pub async fn matured_async(&self, height: u32) -> Result<Vec<LockEntry>> {
        self.run_blocking(move |reg| reg.matured(height)).await
    }

    pub async fn find_all_async(&self) -> Result<Vec<LockEntry>> {
        self.run_blocking(|reg| reg.find_all()).await
    }

    pub async fn get_async(&self, outpoint: OutputRef) -> Result<Option<LockEntry>> {
        self.run_blocking(move |reg| reg.get(&outpoint)).await
    }

    async fn run_blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(LockRegistry) -> Result<T> + Send + 'static,
    {
        let reg = self.clone();
        tokio::task::spawn_blocking(move || f(reg))
            .await
            .map_err(|_| RegistryError::WorkerGone)?
    }
}
