use tokio::sync::watch;
use tracing::*;

use crate::{
    ctx::WatchmanCtx,
    redeem::run_redemption,
    status::WatchmanStatus,
    traits::{ChainSource, KeyCustodian, TxSubmitter},
};

/// Main polling loop. One cycle per new chain height; a height that has not
/// moved since the last poll is not worth rescanning.
pub(crate) async fn watchman_task<C, K, S>(
    ctx: WatchmanCtx<C, K, S>,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    C: ChainSource,
    K: KeyCustodian,
    S: TxSubmitter,
{
    info!(topic = %ctx.topic, "watchman started");
    let mut status = WatchmanStatus::default();

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        match ctx.chain.current_height().await {
            Ok(height) if height != status.last_seen_height => {
                status.last_seen_height = height;
                run_cycle(&ctx, height, &mut status, &shutdown_rx).await;
                status.cycles += 1;
                ctx.publish_status(&status);
            }
            Ok(height) => {
                trace!(%height, "height unchanged, skipping scan");
            }
            Err(err) => {
                warn!(%err, "failed to poll chain height");
            }
        }

        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    // handle dropped, nobody left to ask us to stop
                    break;
                }
            }
            _ = tokio::time::sleep(ctx.poll_interval) => {}
        }
    }

    info!("watchman stopped");
}

/// Scans the registry at `height` and processes every matured entry.
/// Entries are independent: one failure is logged and retried next cycle,
/// never allowed to stop the rest of the scan.
async fn run_cycle<C, K, S>(
    ctx: &WatchmanCtx<C, K, S>,
    height: u32,
    status: &mut WatchmanStatus,
    shutdown_rx: &watch::Receiver<bool>,
) where
    C: ChainSource,
    K: KeyCustodian,
    S: TxSubmitter,
{
    let due = match ctx.registry.matured_async(height).await {
        Ok(due) => due,
        Err(err) => {
            warn!(%err, "registry scan failed");
            return;
        }
    };
    status.last_due = due.len() as u64;
    if due.is_empty() {
        return;
    }
    info!(%height, due = due.len(), "processing matured locks");

    for entry in due {
        if *shutdown_rx.borrow() {
            info!("shutdown requested, not starting further redemptions");
            break;
        }

        let outpoint = *entry.outpoint();
        let Some(key_ref) = entry.key_ref().cloned() else {
            // tracked but not ours to redeem
            debug!(%outpoint, "no key binding, leaving for its owner");
            continue;
        };
        if !ctx.inflight.try_begin(outpoint) {
            debug!(%outpoint, "redemption already in flight");
            continue;
        }

        let attempt = run_redemption(
            &entry,
            &key_ref,
            &ctx.topic,
            ctx.custodian.as_ref(),
            ctx.submitter.as_ref(),
        );
        let result = tokio::time::timeout(ctx.entry_timeout, attempt).await;
        ctx.inflight.finish(&outpoint);

        match result {
            Ok(Ok(())) => {
                status.redeemed += 1;
                info!(%outpoint, "redemption submitted");
            }
            Ok(Err(err)) if err.is_transient() => {
                status.failed += 1;
                warn!(%outpoint, %err, "redemption failed, retrying next cycle");
            }
            Ok(Err(err)) => {
                status.failed += 1;
                error!(%outpoint, %err, "redemption failed and needs attention");
            }
            Err(_) => {
                status.failed += 1;
                warn!(%outpoint, "redemption timed out, retrying next cycle");
            }
        }
    }
}
