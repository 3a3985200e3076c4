use std::{future::Future, sync::Arc, time::Duration};

use hodlock_storage::LockRegistry;
use tokio::sync::watch;

use crate::{
    ctx::WatchmanCtx,
    inflight::InflightSet,
    status::WatchmanStatus,
    task::watchman_task,
    traits::{ChainSource, KeyCustodian, TxSubmitter},
};

/// Default topic finished spends are submitted under.
const DEFAULT_TOPIC: &str = "tm_hodlock";
/// Default seconds between height polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(6);
/// Default budget for one entry's redemption attempt.
const DEFAULT_ENTRY_TIMEOUT: Duration = Duration::from_secs(30);

/// Handle for observing and stopping a running watchman.
#[derive(Debug)]
pub struct WatchmanHandle {
    status_rx: watch::Receiver<WatchmanStatus>,
    shutdown_tx: watch::Sender<bool>,
}

impl WatchmanHandle {
    /// Watcher over per-cycle status updates.
    pub fn status_watcher(&self) -> watch::Receiver<WatchmanStatus> {
        self.status_rx.clone()
    }

    /// Most recent published status.
    pub fn status(&self) -> WatchmanStatus {
        self.status_rx.borrow().clone()
    }

    /// Requests a graceful stop: the entry currently being redeemed is
    /// finished, no new entries are started, the task exits.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Builder for a watchman bound to a registry and its three external
/// collaborators.
#[derive(Debug)]
pub struct WatchmanBuilder<C, K, S> {
    registry: LockRegistry,
    chain: Arc<C>,
    custodian: Arc<K>,
    submitter: Arc<S>,
    topic: Option<String>,
    poll_interval: Option<Duration>,
    entry_timeout: Option<Duration>,
}

impl<C, K, S> WatchmanBuilder<C, K, S>
where
    C: ChainSource,
    K: KeyCustodian,
    S: TxSubmitter,
{
    pub fn new(registry: LockRegistry, chain: Arc<C>, custodian: Arc<K>, submitter: Arc<S>) -> Self {
        Self {
            registry,
            chain,
            custodian,
            submitter,
            topic: None,
            poll_interval: None,
            entry_timeout: None,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn with_entry_timeout(mut self, timeout: Duration) -> Self {
        self.entry_timeout = Some(timeout);
        self
    }

    /// Builds the handle and the task future; the caller decides where the
    /// task runs.
    pub fn build(self) -> (WatchmanHandle, impl Future<Output = ()>) {
        let (status_tx, status_rx) = watch::channel(WatchmanStatus::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let ctx = WatchmanCtx {
            registry: self.registry,
            chain: self.chain,
            custodian: self.custodian,
            submitter: self.submitter,
            topic: self.topic.unwrap_or_else(|| DEFAULT_TOPIC.to_owned()),
            poll_interval: self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL),
            entry_timeout: self.entry_timeout.unwrap_or(DEFAULT_ENTRY_TIMEOUT),
            inflight: Arc::new(InflightSet::new()),
            status_tx,
        };
        let task = watchman_task(ctx, shutdown_rx);

        let handle = WatchmanHandle {
            status_rx,
            shutdown_tx,
        };
        (handle, task)
    }
}
