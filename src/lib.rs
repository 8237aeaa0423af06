//! Relaynode: seed-backed Bitcoin wallet tools and a coin forwarding daemon.
//!
//! # Architecture
//!
//! ```text
//! forwarding-service (entry point)
//!   │
//!   ├── ForwardConfig (network selector + RELAYNODE_* env + .env)
//!   │
//!   ├── WalletSeed ──▶ SeedStore (<prefix>.seed.json)
//!   │
//!   ├── BdkWallet (BDK 2.x, bdk_file_store, Electrum)
//!   │
//!   ├── ChainMonitor ── polls ──▶ ConfirmationTracker
//!   │     └── WalletEvent (CoinsReceived, DepthReached, WatchFailed)
//!   │
//!   └── ForwardingService
//!         └── Forwarder (value - fee → destination, once per tx)
//!
//! restore-from-seed  → tools::restore_from_seed
//! backup-to-seed     → tools::backup_to_seed
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use relaynode::{ForwardConfig, ForwardingNode, install_signal_handlers};
//!
//! let config = ForwardConfig::for_selector(Some("testnet")).apply_env()?;
//! let node = ForwardingNode::open(config, "tb1q...")?;
//! node.run(install_signal_handlers()).await?;
//! ```

pub mod chain;
pub mod cli;
pub mod forward;
pub mod logging;
pub mod node;
pub mod runtime;
pub mod seed;
pub mod tools;
pub mod wallet;

pub use chain::{ChainMonitor, ChainSnapshot, ChainSource, ConfirmationTracker, DepthWatch, TxObservation, WalletEvent};
pub use forward::{FailurePolicy, ForwardError, ForwardState, Forwarder, ForwardingService, ForwardingWallet};
pub use logging::init_logging;
pub use node::{ForwardConfig, ForwardingNode, NodeError};
pub use runtime::{install_signal_handlers, Shutdown};
pub use seed::{SeedError, SeedStore, WalletSeed};
pub use wallet::{BdkWallet, Network, WalletError, WalletFiles};
