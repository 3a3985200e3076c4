use std::{sync::Arc, time::Duration};

use hodlock_storage::LockRegistry;
use tokio::sync::watch;

use crate::{
    inflight::InflightSet,
    status::WatchmanStatus,
    traits::{ChainSource, KeyCustodian, TxSubmitter},
};

/// Everything the watchman task needs.
pub(crate) struct WatchmanCtx<C, K, S> {
    pub registry: LockRegistry,
    pub chain: Arc<C>,
    pub custodian: Arc<K>,
    pub submitter: Arc<S>,
    /// Topic the finished spends are submitted under.
    pub topic: String,
    pub poll_interval: Duration,
    /// Budget for one entry's pipeline, custodian and submission calls
    /// included. Scoped per entry so a hung call cannot stall the rest of
    /// the scan.
    pub entry_timeout: Duration,
    pub inflight: Arc<InflightSet>,
    pub status_tx: watch::Sender<WatchmanStatus>,
}

impl<C, K, S> WatchmanCtx<C, K, S>
where
    C: ChainSource,
    K: KeyCustodian,
    S: TxSubmitter,
{
    pub(crate) fn publish_status(&self, status: &WatchmanStatus) {
        let _ = self.status_tx.send(status.clone());
    }
}
