//! backup-to-seed - Create a wallet, print its seed words and save both

use clap::Parser;
use relaynode::cli::BackupArgs;
use relaynode::logging::init_logging;
use relaynode::tools::backup_to_seed;

fn main() -> anyhow::Result<()> {
    init_logging();

    let opts = BackupArgs::parse().options();
    let (seed, report) = backup_to_seed(&opts)?;
    println!("{}", seed.mnemonic_code());
    println!("creation time: {}", seed.creation_time());
    println!("seed backup: {}", report.seed_path.display());
    println!("wallet: {}", report.wallet_path.display());
    println!("receive address: {}", report.receive_address);
    Ok(())
}
