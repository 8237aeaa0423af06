//! restore-from-seed - Rebuild a wallet from its mnemonic words and rescan the chain

use clap::Parser;
use relaynode::cli::RestoreArgs;
use relaynode::logging::init_logging;
use relaynode::tools::restore_from_seed;

fn main() -> anyhow::Result<()> {
    init_logging();
    let _ = rustls::crypto::ring::default_provider().install_default();

    let opts = RestoreArgs::parse().options();
    tracing::info!(network = %opts.network, electrum = opts.electrum_url(), "Restoring wallet from seed");
    let summary = restore_from_seed(&opts)?;
    println!("{}", summary);
    Ok(())
}
