//! Chain - Confirmation tracking over polled wallet snapshots
//!
//! BDK has no push notifications. [`ChainMonitor`] syncs on an interval, hands each
//! [`ChainSnapshot`] to a [`ConfirmationTracker`], and emits [`WalletEvent`]s:
//!
//! ```text
//! ChainSource::refresh + snapshot ──▶ ConfirmationTracker::observe ──▶ WalletEvent queue
//!                                               ▲
//!                         DepthWatch requests ──┘
//! ```

mod monitor;
mod tracker;

pub use monitor::ChainMonitor;
pub use tracker::ConfirmationTracker;

use crate::wallet::WalletResult;
use bitcoin::{Amount, Txid};

/// What the wallet knows about one transaction at snapshot time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxObservation {
    pub txid: Txid,
    pub received: Amount,
    pub sent: Amount,
    pub confirmation_height: Option<u32>,
}

impl TxObservation {
    /// Blocks on top of (and including) the confirming block. 0 while unconfirmed.
    pub fn depth(&self, tip_height: u32) -> u32 {
        match self.confirmation_height {
            Some(height) if tip_height >= height => tip_height - height + 1,
            _ => 0,
        }
    }

    /// Net incoming: pays us more than it spends from us.
    pub fn is_incoming(&self) -> bool { self.received > self.sent }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainSnapshot {
    pub tip_height: u32,
    pub transactions: Vec<TxObservation>,
}

impl ChainSnapshot {
    pub fn get(&self, txid: &Txid) -> Option<&TxObservation> {
        self.transactions.iter().find(|tx| &tx.txid == txid)
    }
}

/// Request to be told once `txid` reaches `depth` confirmations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthWatch {
    pub txid: Txid,
    pub depth: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    CoinsReceived { txid: Txid, value: Amount },
    DepthReached { txid: Txid, depth: u32 },
    WatchFailed { txid: Txid, reason: String },
}

/// Anything that can bring itself up to date and describe its transactions.
/// Both calls block; callers run them off the async executor.
pub trait ChainSource: Send + Sync + 'static {
    fn refresh(&self) -> WalletResult<()>;
    fn snapshot(&self) -> WalletResult<ChainSnapshot>;
}
