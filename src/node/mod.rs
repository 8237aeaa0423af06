//! Node - The forwarding daemon assembled from config
//!
//! Opening parses the destination before anything touches disk or network, loads
//! (or creates) the seed backup, opens the wallet and connects to Electrum.
//! Running primes the chain view, logs where to send coins, then drives the
//! monitor and the forwarding service until shutdown.

mod config;

pub use config::{
    load_dotenv, ConfigError, ForwardConfig, DEFAULT_CONFIRMATIONS, DEFAULT_FEE_SAT, DEFAULT_POLL_SECS,
    ENV_CONFIRMATIONS, ENV_DATA_DIR, ENV_ELECTRUM_URL, ENV_FAILURE_POLICY, ENV_FEE_SAT, ENV_POLL_SECS, FILE_PREFIX,
};

use crate::chain::ChainMonitor;
use crate::forward::{ForwardContext, ForwardError, Forwarder, ForwardingService};
use crate::runtime::Shutdown;
use crate::seed::{SeedError, WalletSeed};
use crate::wallet::{parse_address, BdkWallet, WalletError};
use bitcoin::Address;
use std::sync::Arc;
use tokio::sync::mpsc;

const QUEUE_DEPTH: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("Config: {0}")]
    Config(#[from] ConfigError),
    #[error("Bad destination address {address:?}: {source}")]
    Destination {
        address: String,
        #[source]
        source: WalletError,
    },
    #[error("Seed: {0}")]
    Seed(#[from] SeedError),
    #[error("Wallet: {0}")]
    Wallet(#[from] WalletError),
    #[error("Chain: {0:#}")]
    Chain(anyhow::Error),
    #[error("Forward: {0}")]
    Forward(#[from] ForwardError),
}

pub struct ForwardingNode {
    config: ForwardConfig,
    seed: WalletSeed,
    wallet: Arc<BdkWallet>,
    destination: Address,
}

impl ForwardingNode {
    /// Blocking: opens files and connects to the Electrum server.
    pub fn open(config: ForwardConfig, destination: &str) -> Result<Self, NodeError> {
        config.validate()?;
        let destination = parse_address(destination, config.network)
            .map_err(|source| NodeError::Destination { address: destination.to_string(), source })?;

        let files = config.files();
        let (seed, _created) = files.seed_store().load_or_generate()?;
        if config.network.connects_to_localhost() {
            tracing::info!("Regtest: connecting to local node");
        }
        let wallet = BdkWallet::open(&seed, config.network, &files.wallet_path(), config.electrum_url())?;

        Ok(Self { config, seed, wallet: Arc::new(wallet), destination })
    }

    pub fn config(&self) -> &ForwardConfig { &self.config }
    pub fn seed(&self) -> &WalletSeed { &self.seed }
    pub fn wallet(&self) -> Arc<BdkWallet> { self.wallet.clone() }
    pub fn destination(&self) -> &Address { &self.destination }

    fn log_seed(&self) {
        tracing::info!("seed: {}", self.seed);
        tracing::info!("creation time: {}", self.seed.creation_time());
        tracing::info!("mnemonicCode: {}", self.seed.words().join(" "));
    }

    pub async fn run(self, shutdown: Shutdown) -> Result<(), NodeError> {
        self.log_seed();

        let mut monitor = ChainMonitor::new(self.wallet.clone(), self.config.poll_interval);
        monitor.prime().await.map_err(NodeError::Chain)?;

        let wallet = self.wallet.clone();
        let receive = tokio::task::spawn_blocking(move || wallet.receive_address())
            .await
            .map_err(|e| NodeError::Chain(e.into()))??;
        tracing::info!("Send coins to: {}", receive);
        tracing::info!(destination = %self.destination, fee = %self.config.fee, "Forwarding configured");
        tracing::info!("Waiting for coins to arrive. Press Ctrl-C to quit.");

        let (event_tx, event_rx) = mpsc::channel(QUEUE_DEPTH);
        let (watch_tx, watch_rx) = mpsc::unbounded_channel();
        let monitor_task = tokio::spawn(monitor.run(event_tx, watch_rx, shutdown.subscribe()));

        let ctx = ForwardContext {
            destination: self.destination.clone(),
            fee: self.config.fee,
            required_depth: self.config.confirmations,
        };
        let mut service = ForwardingService::new(Forwarder::new(self.wallet.clone(), ctx), self.config.failure_policy);
        let result = service.run(event_rx, watch_tx, shutdown.subscribe()).await;

        // Escalated failures stop the monitor too
        shutdown.trigger();
        match monitor_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Chain monitor ended with error: {:#}", e),
            Err(e) => tracing::warn!("Chain monitor task failed: {}", e),
        }

        result.map_err(NodeError::from)
    }
}
