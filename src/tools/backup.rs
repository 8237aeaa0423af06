//! Backup - Generate a fresh seed and persist wallet state

use crate::seed::{SeedError, WalletSeed};
use crate::wallet::{BdkWallet, Network, WalletFiles, WalletResult};
use std::path::PathBuf;

pub const BACKUP_PREFIX: &str = "backup-to-seed";

#[derive(Debug, Clone)]
pub struct BackupOptions {
    pub network: Network,
    pub data_dir: PathBuf,
}

impl Default for BackupOptions {
    fn default() -> Self { Self { network: Network::Testnet, data_dir: PathBuf::from(".") } }
}

impl BackupOptions {
    pub fn files(&self) -> WalletFiles { WalletFiles::new(&self.data_dir, self.network.file_prefix(BACKUP_PREFIX)) }
}

#[derive(Debug, Clone)]
pub struct BackupReport {
    pub seed_path: PathBuf,
    pub wallet_path: PathBuf,
    pub receive_address: String,
}

/// New seed → logged words → seed backup file → wallet store. Never replaces an existing backup.
pub fn backup_to_seed(opts: &BackupOptions) -> WalletResult<(WalletSeed, BackupReport)> {
    let files = opts.files();
    let store = files.seed_store();
    if store.exists() {
        return Err(SeedError::AlreadyExists(store.path().to_path_buf()).into());
    }

    let seed = WalletSeed::generate_now()?;
    tracing::info!("seed: {}", seed);
    tracing::info!("creation time: {}", seed.creation_time());
    tracing::info!("mnemonicCode: {}", seed.words().join(" "));

    store.save(&seed)?;
    let wallet = BdkWallet::open_offline(&seed, opts.network, &files.wallet_path())?;
    let receive_address = wallet.receive_address()?;
    tracing::info!(seed = %store.path().display(), wallet = %files.wallet_path().display(), "Wallet saved");

    Ok((seed, BackupReport { seed_path: files.seed_path(), wallet_path: files.wallet_path(), receive_address }))
}
