//! forwarding-service - Forward every received payment, minus a fee, once it confirms
//!
//!   forwarding-service <address-to-send-back-to> [regtest|testnet]
//!
//! Wallet files land in `RELAYNODE_DATA_DIR` (default `.`) as
//! `forwarding-service[-<network>].{wallet,seed.json}`. See `ForwardConfig` for the
//! other `RELAYNODE_*` overrides; a `.env` file in the working directory is read first.

use clap::Parser;
use relaynode::cli::{log_usage, ForwardArgs, Invocation};
use relaynode::logging::init_logging;
use relaynode::node::load_dotenv;
use relaynode::{install_signal_handlers, ForwardConfig, ForwardingNode};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    load_dotenv(".env");
    init_logging();
    let _ = rustls::crypto::ring::default_provider().install_default();

    let (destination, selector) = match ForwardArgs::parse().invocation() {
        Invocation::Usage => {
            log_usage();
            return ExitCode::SUCCESS;
        }
        Invocation::Run { destination, selector } => (destination, selector),
    };

    match run(destination, selector).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(destination: String, selector: Option<String>) -> anyhow::Result<()> {
    let config = ForwardConfig::for_selector(selector.as_deref()).apply_env()?;
    tracing::info!(network = %config.network, data_dir = %config.data_dir.display(), "Starting forwarding service");

    let node = tokio::task::spawn_blocking(move || ForwardingNode::open(config, &destination)).await??;
    node.run(install_signal_handlers()).await?;
    tracing::info!("Forwarding service stopped");
    Ok(())
}
