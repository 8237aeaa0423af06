//! Restore - Rebuild a wallet from mnemonic words and rescan the chain

use crate::seed::WalletSeed;
use crate::wallet::{BdkWallet, Network, WalletFiles, WalletResult, WalletSummary};
use bdk_wallet::KeychainKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

pub const RESTORE_PREFIX: &str = "restore-from-seed";
pub const RESTORE_MNEMONIC: &str = "yard impulse luxury drive today throw farm pepper survey wreck glass federal";
pub const RESTORE_CREATION_TIME: u64 = 1_409_478_661;

/// Log a progress line every this many scripts per keychain
const PROGRESS_EVERY: u32 = 10;

#[derive(Debug, Clone)]
pub struct RestoreOptions {
    pub mnemonic: String,
    pub passphrase: String,
    pub creation_time: u64,
    pub network: Network,
    pub data_dir: PathBuf,
    pub electrum_url: Option<String>,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            mnemonic: RESTORE_MNEMONIC.into(),
            passphrase: String::new(),
            creation_time: RESTORE_CREATION_TIME,
            network: Network::Testnet,
            data_dir: PathBuf::from("."),
            electrum_url: None,
        }
    }
}

impl RestoreOptions {
    pub fn files(&self) -> WalletFiles { WalletFiles::new(&self.data_dir, self.network.file_prefix(RESTORE_PREFIX)) }
    pub fn electrum_url(&self) -> &str {
        self.electrum_url.as_deref().unwrap_or_else(|| self.network.default_electrum_url())
    }
}

/// Counts scripts checked during a full scan, per keychain.
#[derive(Debug, Clone, Default)]
pub struct DownloadProgress {
    external: Arc<AtomicU32>,
    internal: Arc<AtomicU32>,
}

impl DownloadProgress {
    pub fn new() -> Self { Self::default() }

    pub fn record(&self, keychain: KeychainKind, index: u32) {
        let counter = match keychain {
            KeychainKind::External => &self.external,
            KeychainKind::Internal => &self.internal,
        };
        let checked = counter.fetch_add(1, Ordering::Relaxed) + 1;
        if checked % PROGRESS_EVERY == 0 {
            tracing::info!("Scanning {:?} keychain: {} scripts checked (index {})", keychain, checked, index);
        }
    }

    pub fn scripts_checked(&self) -> u32 {
        self.external.load(Ordering::Relaxed) + self.internal.load(Ordering::Relaxed)
    }
}

/// Build the seed, drop any existing chain file so the scan starts from scratch,
/// and open the wallet offline.
pub fn prepare_restore(opts: &RestoreOptions) -> WalletResult<BdkWallet> {
    let seed = WalletSeed::from_phrase(&opts.mnemonic, &opts.passphrase, opts.creation_time)?;
    let files = opts.files();
    if files.reset_chain()? {
        tracing::info!("Removed existing chain file {}", files.wallet_path().display());
    }
    BdkWallet::open_offline(&seed, opts.network, &files.wallet_path())
}

/// Restore, download chain data with progress, and report the final state.
pub fn restore_from_seed(opts: &RestoreOptions) -> WalletResult<WalletSummary> {
    let mut wallet = prepare_restore(opts)?;
    tracing::info!("{}", wallet.summary()?);

    wallet.connect_electrum(opts.electrum_url())?;
    let progress = DownloadProgress::new();
    let recorder = progress.clone();
    wallet.full_scan(move |keychain, index| recorder.record(keychain, index))?;
    tracing::info!(scripts = progress.scripts_checked(), "blockchain downloaded");

    for tx in wallet.transactions(usize::MAX)? {
        tracing::info!(
            txid = %tx.txid,
            received = tx.received,
            sent = tx.sent,
            height = ?tx.block_height,
            "Restored transaction"
        );
    }
    let summary = wallet.summary()?;
    tracing::info!("{}", summary);
    Ok(summary)
}
