//! ForwardingService - Queue consumer driving the Forwarder

use super::{FailurePolicy, ForwardError, Forwarder, ForwardingWallet};
use crate::chain::{DepthWatch, WalletEvent};
use tokio::sync::{broadcast, mpsc};

/// Handles one event at a time, so two forwards never build transactions concurrently.
/// Watch registration never blocks, so a busy monitor cannot stall the event loop.
pub struct ForwardingService<W: ForwardingWallet> {
    forwarder: Forwarder<W>,
    policy: FailurePolicy,
}

impl<W: ForwardingWallet> ForwardingService<W> {
    pub fn new(forwarder: Forwarder<W>, policy: FailurePolicy) -> Self { Self { forwarder, policy } }

    pub fn forwarder(&self) -> &Forwarder<W> { &self.forwarder }
    pub fn policy(&self) -> FailurePolicy { self.policy }

    /// Consume events until shutdown or until the queue closes. Returns the first
    /// error only under [`FailurePolicy::Escalate`].
    pub async fn run(
        &mut self,
        mut events: mpsc::Receiver<WalletEvent>,
        watches: mpsc::UnboundedSender<DepthWatch>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ForwardError> {
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Forwarding service stopping");
                    return Ok(());
                }
                event = events.recv() => match event {
                    Some(event) => self.handle(event, &watches).await?,
                    None => {
                        tracing::info!("Event queue closed, forwarding service stopping");
                        return Ok(());
                    }
                },
            }
        }
    }

    pub async fn handle(&mut self, event: WalletEvent, watches: &mpsc::UnboundedSender<DepthWatch>) -> Result<(), ForwardError> {
        let result = match event {
            WalletEvent::CoinsReceived { txid, value } => {
                if let Some(watch) = self.forwarder.on_coins_received(txid, value) {
                    if watches.send(watch).is_err() {
                        tracing::warn!(%txid, "Chain monitor gone, confirmation watch not registered");
                    }
                }
                Ok(())
            }
            WalletEvent::DepthReached { txid, depth } => {
                self.forwarder.on_depth_reached(txid, depth).await.map(|_| ())
            }
            WalletEvent::WatchFailed { txid, reason } => Err(self.forwarder.on_watch_failed(txid, &reason)),
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) => self.apply_policy(e),
        }
    }

    fn apply_policy(&self, err: ForwardError) -> Result<(), ForwardError> {
        match self.policy {
            FailurePolicy::LogAndDrop => {
                tracing::error!(txid = %err.txid(), "Error occurred while forwarding: {}", err);
                Ok(())
            }
            FailurePolicy::Escalate => {
                tracing::error!(txid = %err.txid(), "Forwarding failed, escalating: {}", err);
                Err(err)
            }
        }
    }
}
