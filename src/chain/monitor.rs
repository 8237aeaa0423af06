//! ChainMonitor - Poll loop feeding the confirmation tracker

use super::{ChainSnapshot, ChainSource, ConfirmationTracker, DepthWatch, WalletEvent};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;

pub struct ChainMonitor<S: ChainSource> {
    source: Arc<S>,
    tracker: ConfirmationTracker,
    poll_interval: Duration,
}

impl<S: ChainSource> ChainMonitor<S> {
    pub fn new(source: Arc<S>, poll_interval: Duration) -> Self {
        Self { source, tracker: ConfirmationTracker::new(), poll_interval }
    }

    pub fn tracker(&self) -> &ConfirmationTracker { &self.tracker }

    /// First sync. Establishes the baseline so only later payments count as received.
    pub async fn prime(&mut self) -> Result<()> {
        let events = self.poll().await?;
        debug_assert!(events.iter().all(|e| !matches!(e, WalletEvent::CoinsReceived { .. })));
        tracing::info!(tip = ?self.tracker.tip_height(), "Chain view ready");
        Ok(())
    }

    /// Run until shutdown or until nobody listens for events. Sync failures are logged
    /// and retried on the next tick.
    pub async fn run(
        mut self,
        events: mpsc::Sender<WalletEvent>,
        mut watches: mpsc::UnboundedReceiver<DepthWatch>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<()> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let batch = tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Chain monitor stopping");
                    return Ok(());
                }
                Some(watch) = watches.recv() => {
                    tracing::debug!(txid = %watch.txid, depth = watch.depth, "Depth watch registered");
                    self.tracker.watch(watch)
                }
                _ = ticker.tick() => match self.poll().await {
                    Ok(batch) => batch,
                    Err(e) => {
                        tracing::warn!("Chain sync failed, retrying next tick: {:#}", e);
                        continue;
                    }
                },
            };

            // A full event queue must not hide shutdown
            for event in batch {
                tokio::select! {
                    _ = shutdown.recv() => {
                        tracing::info!("Chain monitor stopping with events undelivered");
                        return Ok(());
                    }
                    sent = events.send(event) => if sent.is_err() {
                        tracing::info!("Event queue closed, chain monitor stopping");
                        return Ok(());
                    },
                }
            }
        }
    }

    async fn poll(&mut self) -> Result<Vec<WalletEvent>> {
        let source = self.source.clone();
        let snapshot = tokio::task::spawn_blocking(move || -> crate::wallet::WalletResult<ChainSnapshot> {
            source.refresh()?;
            source.snapshot()
        }).await??;
        tracing::trace!(tip = snapshot.tip_height, txs = snapshot.transactions.len(), "Snapshot");
        Ok(self.tracker.observe(snapshot))
    }
}
