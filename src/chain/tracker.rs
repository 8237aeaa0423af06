//! ConfirmationTracker - Turns successive snapshots into wallet events

use super::{ChainSnapshot, DepthWatch, WalletEvent};
use bitcoin::Txid;
use std::collections::{HashMap, HashSet};

/// Pure state: which txids have been seen and which depth watches are pending.
///
/// The first snapshot is a baseline; transactions already in the wallet when the
/// tracker starts do not produce `CoinsReceived`. A watch fires at most once.
#[derive(Debug, Default)]
pub struct ConfirmationTracker {
    /// Every txid the wallet has shown us. Grows with the wallet's own history (which
    /// BDK already holds in memory); pruning would re-report a tx that reappears.
    seen: HashSet<Txid>,
    watches: HashMap<Txid, u32>,
    last: Option<ChainSnapshot>,
}

impl ConfirmationTracker {
    pub fn new() -> Self { Self::default() }

    pub fn is_baselined(&self) -> bool { self.last.is_some() }
    pub fn pending_watches(&self) -> usize { self.watches.len() }
    pub fn tip_height(&self) -> Option<u32> { self.last.as_ref().map(|s| s.tip_height) }

    pub fn observe(&mut self, snapshot: ChainSnapshot) -> Vec<WalletEvent> {
        let mut events = Vec::new();
        let baseline = self.last.is_none();

        for tx in &snapshot.transactions {
            if self.seen.insert(tx.txid) && !baseline && tx.is_incoming() {
                events.push(WalletEvent::CoinsReceived { txid: tx.txid, value: tx.received });
            }
        }
        if baseline {
            tracing::debug!(known = self.seen.len(), tip = snapshot.tip_height, "Baseline snapshot");
        }

        self.last = Some(snapshot);
        events.extend(self.fire_watches());
        events
    }

    /// Register a watch. Evaluated right away against the last snapshot, so a tx that
    /// is already deep enough fires immediately.
    pub fn watch(&mut self, watch: DepthWatch) -> Vec<WalletEvent> {
        self.watches.insert(watch.txid, watch.depth);
        self.fire_watches()
    }

    fn fire_watches(&mut self) -> Vec<WalletEvent> {
        let Self { watches, last, .. } = self;
        let Some(snapshot) = last.as_ref() else { return Vec::new() };

        let mut events = Vec::new();
        watches.retain(|txid, required| match snapshot.get(txid) {
            Some(tx) => {
                let depth = tx.depth(snapshot.tip_height);
                if depth >= *required {
                    events.push(WalletEvent::DepthReached { txid: *txid, depth });
                    false
                } else {
                    true
                }
            }
            None => {
                events.push(WalletEvent::WatchFailed {
                    txid: *txid,
                    reason: "transaction no longer in the wallet's best chain view".into(),
                });
                false
            }
        });
        events
    }
}
