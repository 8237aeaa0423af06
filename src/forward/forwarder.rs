//! Forwarder - Named transition handlers for the forwarding state machine

use super::{ForwardError, ForwardState, ForwardingWallet};
use crate::chain::DepthWatch;
use bitcoin::{Address, Amount, Txid};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Fixed inputs to every forward
#[derive(Debug, Clone)]
pub struct ForwardContext {
    pub destination: Address,
    pub fee: Amount,
    pub required_depth: u32,
}

#[derive(Debug)]
struct ForwardEntry {
    value: Amount,
    state: ForwardState,
}

/// `value - fee`, or `None` when the fee eats the whole payment.
pub fn forward_amount(value: Amount, fee: Amount) -> Option<Amount> {
    value.checked_sub(fee).filter(|amount| *amount > Amount::ZERO)
}

/// Finished (forwarded or failed) entries kept for `state` queries.
pub const FINISHED_HISTORY: usize = 1024;

pub struct Forwarder<W: ForwardingWallet> {
    wallet: Arc<W>,
    ctx: ForwardContext,
    entries: HashMap<Txid, ForwardEntry>,
    /// Terminal txids, oldest first; evicted from `entries` past `history`
    finished: VecDeque<Txid>,
    history: usize,
}

impl<W: ForwardingWallet> Forwarder<W> {
    pub fn new(wallet: Arc<W>, ctx: ForwardContext) -> Self {
        Self { wallet, ctx, entries: HashMap::new(), finished: VecDeque::new(), history: FINISHED_HISTORY }
    }

    pub fn with_history(mut self, history: usize) -> Self { self.history = history; self }

    pub fn context(&self) -> &ForwardContext { &self.ctx }
    pub fn state(&self, txid: &Txid) -> Option<&ForwardState> { self.entries.get(txid).map(|e| &e.state) }
    pub fn tracked(&self) -> usize { self.entries.len() }

    /// Received → AwaitingConfirmation. Returns the watch to register with the chain monitor.
    pub fn on_coins_received(&mut self, txid: Txid, value: Amount) -> Option<DepthWatch> {
        if value == Amount::ZERO {
            tracing::debug!(%txid, "Ignoring transaction that pays us nothing");
            return None;
        }
        if self.entries.contains_key(&txid) {
            tracing::debug!(%txid, "Transaction already tracked");
            return None;
        }

        tracing::info!("Received tx for {}: {}", value, txid);
        self.entries.insert(txid, ForwardEntry { value, state: ForwardState::Received });
        tracing::info!("Transaction will be forwarded after it confirms.");
        self.transition(&txid, ForwardState::AwaitingConfirmation);
        Some(DepthWatch { txid, depth: self.ctx.required_depth })
    }

    /// AwaitingConfirmation → Forwarding → Forwarded | Failed.
    ///
    /// `Ok(None)` when there is nothing to do: unknown tx, not awaiting, or not deep enough.
    pub async fn on_depth_reached(&mut self, txid: Txid, depth: u32) -> Result<Option<Txid>, ForwardError> {
        let value = match self.entries.get(&txid) {
            Some(entry) if entry.state == ForwardState::AwaitingConfirmation => entry.value,
            Some(entry) => {
                tracing::debug!(%txid, state = entry.state.name(), "Depth notification ignored");
                return Ok(None);
            }
            None => {
                tracing::warn!(%txid, "Depth notification for unknown transaction");
                return Ok(None);
            }
        };
        if depth < self.ctx.required_depth {
            return Ok(None);
        }

        self.transition(&txid, ForwardState::Forwarding);
        match self.forward_coins(txid, value).await {
            Ok(sent) => {
                self.transition(&txid, ForwardState::Forwarded { txid: sent });
                tracing::info!("Sent coins onwards! Transaction hash is {}", sent);
                Ok(Some(sent))
            }
            Err(e) => {
                self.transition(&txid, ForwardState::Failed { reason: e.to_string() });
                Err(e)
            }
        }
    }

    /// AwaitingConfirmation → Failed when the confirmation watch breaks.
    pub fn on_watch_failed(&mut self, txid: Txid, reason: &str) -> ForwardError {
        if self.entries.get(&txid).is_some_and(|e| !e.state.is_terminal()) {
            self.transition(&txid, ForwardState::Failed { reason: reason.to_string() });
        }
        ForwardError::WatchFailed { txid, reason: reason.to_string() }
    }

    async fn forward_coins(&self, txid: Txid, value: Amount) -> Result<Txid, ForwardError> {
        let fee = self.ctx.fee;
        let amount = forward_amount(value, fee).ok_or_else(|| ForwardError::InsufficientFunds {
            txid,
            detail: format!("received {} does not cover the {} fee", value, fee),
        })?;

        let wallet = self.wallet.clone();
        let to = self.ctx.destination.clone();
        tracing::info!(%txid, %amount, %fee, destination = %to, "Forwarding");
        tokio::task::spawn_blocking(move || wallet.forward(&to, amount, fee))
            .await
            .map_err(|e| ForwardError::Join { txid, detail: e.to_string() })?
            .map_err(|e| ForwardError::from_wallet(txid, e))
    }

    fn transition(&mut self, txid: &Txid, next: ForwardState) {
        let Some(entry) = self.entries.get_mut(txid) else { return };
        tracing::debug!(%txid, from = entry.state.name(), to = next.name(), "Forward state");
        let finished = next.is_terminal() && !entry.state.is_terminal();
        entry.state = next;

        if finished {
            self.finished.push_back(*txid);
            while self.finished.len() > self.history {
                if let Some(old) = self.finished.pop_front() {
                    self.entries.remove(&old);
                }
            }
        }
    }
}
