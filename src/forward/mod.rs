//! Forward - Relay received coins to a fixed address once they confirm
//!
//! # State machine (per incoming transaction)
//!
//! ```text
//! Received ──▶ AwaitingConfirmation ──(depth reached)──▶ Forwarding ──┬──▶ Forwarded { txid }
//!                      │                                              └──▶ Failed { reason }
//!                      └──(watch failed)───────────────────────────────────▶ Failed { reason }
//! ```
//!
//! [`Forwarder`] holds the transitions; [`ForwardingService`] feeds it events from
//! the chain monitor one at a time and applies the [`FailurePolicy`]. Failed
//! forwards are never retried and nothing here survives a restart.

mod forwarder;
mod service;

pub use forwarder::{forward_amount, ForwardContext, Forwarder, FINISHED_HISTORY};
pub use service::ForwardingService;

use crate::wallet::{WalletError, WalletResult};
use bitcoin::{Address, Amount, Txid};

/// The one wallet operation forwarding needs. Blocking; called via `spawn_blocking`.
pub trait ForwardingWallet: Send + Sync + 'static {
    /// Send exactly `amount` to `to`, paying exactly `fee`, and broadcast it.
    fn forward(&self, to: &Address, amount: Amount, fee: Amount) -> WalletResult<Txid>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardState {
    Received,
    AwaitingConfirmation,
    Forwarding,
    Forwarded { txid: Txid },
    Failed { reason: String },
}

impl ForwardState {
    pub fn name(&self) -> &'static str {
        match self {
            ForwardState::Received => "received",
            ForwardState::AwaitingConfirmation => "awaiting-confirmation",
            ForwardState::Forwarding => "forwarding",
            ForwardState::Forwarded { .. } => "forwarded",
            ForwardState::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ForwardState::Forwarded { .. } | ForwardState::Failed { .. })
    }
}

/// What to do when a forward fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the error, drop the forward, keep running
    #[default]
    LogAndDrop,
    /// Stop the service with the error
    Escalate,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::LogAndDrop => "log",
            FailurePolicy::Escalate => "escalate",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "log" | "drop" | "log-and-drop" => Some(FailurePolicy::LogAndDrop),
            "escalate" | "fail" | "abort" => Some(FailurePolicy::Escalate),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("insufficient money to forward {txid}: {detail}")]
    InsufficientFunds { txid: Txid, detail: String },
    #[error("key error while signing forward of {txid}: {detail}")]
    KeyDecryption { txid: Txid, detail: String },
    #[error("broadcast of forward for {txid} failed: {detail}")]
    Broadcast { txid: Txid, detail: String },
    #[error("confirmation watch for {txid} failed: {reason}")]
    WatchFailed { txid: Txid, reason: String },
    #[error("forward of {txid} failed: {source}")]
    Wallet {
        txid: Txid,
        #[source]
        source: WalletError,
    },
    #[error("forward task for {txid} did not complete: {detail}")]
    Join { txid: Txid, detail: String },
}

impl ForwardError {
    /// Sort a wallet failure into the forwarding taxonomy.
    pub fn from_wallet(txid: Txid, err: WalletError) -> Self {
        match err {
            WalletError::InsufficientFunds(detail) => ForwardError::InsufficientFunds { txid, detail },
            WalletError::Signing(detail) => ForwardError::KeyDecryption { txid, detail },
            WalletError::Broadcast(detail) => ForwardError::Broadcast { txid, detail },
            source => ForwardError::Wallet { txid, source },
        }
    }

    /// The incoming transaction whose forward failed.
    pub fn txid(&self) -> Txid {
        match self {
            ForwardError::InsufficientFunds { txid, .. }
            | ForwardError::KeyDecryption { txid, .. }
            | ForwardError::Broadcast { txid, .. }
            | ForwardError::WatchFailed { txid, .. }
            | ForwardError::Wallet { txid, .. }
            | ForwardError::Join { txid, .. } => *txid,
        }
    }

    pub fn is_insufficient_funds(&self) -> bool { matches!(self, ForwardError::InsufficientFunds { .. }) }
}
