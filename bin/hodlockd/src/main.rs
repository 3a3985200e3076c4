//! hodlockd: tracks time-locked coin contracts for one overlay topic and
//! redeems matured locks through the wallet boundary. Admission and lookup
//! surfaces live in `hodlock-overlay` and are hosted by the overlay engine;
//! this binary runs the registry and the redemption watchman.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use argh::from_env;
use hodlock_config::HodlockConfig;
use hodlock_db_sled::SledLockStore;
use hodlock_storage::LockRegistry;
use hodlock_watchman::WatchmanBuilder;
use tokio::runtime;
use tracing::info;

use crate::{
    args::Args,
    wallet_client::{OverlaySubmitClient, WalletHttpClient},
};

mod args;
mod wallet_client;

fn main() -> Result<()> {
    let args: Args = from_env();

    let mut config =
        HodlockConfig::load(&args.config).context("failed to load configuration")?;
    if let Some(datadir) = args.datadir {
        config.datadir = datadir;
    }

    init_logging();

    let rt = runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("hodlock-rt")
        .build()
        .context("failed to build runtime")?;

    rt.block_on(run(config))
}

async fn run(config: HodlockConfig) -> Result<()> {
    info!(datadir = %config.datadir.display(), topic = %config.topic, "starting hodlockd");

    let sled_db = sled::open(&config.datadir).context("failed to open registry database")?;
    let store = SledLockStore::open(&sled_db).context("failed to open lock store")?;
    let registry = LockRegistry::new(Arc::new(store));

    let wallet = Arc::new(WalletHttpClient::new(config.wallet_url.clone()));
    let submitter = Arc::new(OverlaySubmitClient::new(config.submit_url.clone()));

    let (handle, task) = WatchmanBuilder::new(registry, wallet.clone(), wallet, submitter)
        .with_topic(config.topic.clone())
        .with_poll_interval(Duration::from_secs(config.watchman.poll_interval_secs))
        .with_entry_timeout(Duration::from_secs(config.watchman.entry_timeout_secs))
        .build();
    let watchman = tokio::spawn(task);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");
    handle.shutdown();
    watchman.await.context("watchman task panicked")?;

    info!("exiting hodlockd");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();
}
