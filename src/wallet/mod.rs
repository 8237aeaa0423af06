//! Wallet module - Bitcoin via BDK 2.x
//!
//! Key derivation, coin selection, signing and chain data all come from BDK and
//! an Electrum server. This module only wires them to seeds, files and networks.
//!
//! # Architecture
//!
//! ```text
//! WalletSeed ──▶ BdkWallet ──┬── bdk_file_store   (<prefix>.wallet)
//!                            ├── Electrum client  (sync, full scan, broadcast)
//!                            │
//!                            ├── ChainSource       → ChainMonitor snapshots
//!                            └── ForwardingWallet  → Forwarder sends
//! ```

mod bdk;
mod files;
mod network;

pub use bdk::{BdkWallet, TransactionDetails, WalletBalance, WalletSummary};
pub use files::WalletFiles;
pub use network::Network;

use crate::seed::SeedError;
use bitcoin::Address;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("Seed: {0}")]
    Seed(#[from] SeedError),
    #[error("Key derivation: {0}")]
    KeyDerivation(String),
    #[error("FileStore: {0}")]
    Store(String),
    #[error("Load wallet: {0}")]
    Load(String),
    #[error("Create wallet: {0}")]
    Create(String),
    #[error("Persist: {0}")]
    Persist(String),
    #[error("Electrum: {0}")]
    Electrum(String),
    #[error("Sync: {0}")]
    Sync(String),
    #[error("Address: {0}")]
    Address(String),
    #[error("Network: {0}")]
    Network(String),
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Build: {0}")]
    Build(String),
    #[error("Sign: {0}")]
    Signing(String),
    #[error("Extract: {0}")]
    Extract(String),
    #[error("Broadcast: {0}")]
    Broadcast(String),
    #[error("no chain backend connected")]
    Offline,
    #[error("wallet lock poisoned")]
    Lock,
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
}

pub type WalletResult<T> = Result<T, WalletError>;

/// Parse an address and require it to belong to `network`.
pub fn parse_address(value: &str, network: Network) -> WalletResult<Address> {
    Address::from_str(value.trim())
        .map_err(|e| WalletError::Address(e.to_string()))?
        .require_network(network.to_bdk())
        .map_err(|e| WalletError::Network(e.to_string()))
}
