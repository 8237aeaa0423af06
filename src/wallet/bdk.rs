//! BdkWallet - BIP84 wallet over bdk_wallet 2.x with bdk_file_store persistence
//!
//! Built from a [`WalletSeed`]. Opening is always offline; an Electrum backend is
//! attached separately so derivation and persistence work without a server.

use super::{Network, WalletError, WalletResult};
use crate::chain::{ChainSnapshot, ChainSource, TxObservation};
use crate::forward::ForwardingWallet;
use crate::seed::WalletSeed;
use bdk_electrum::{
    electrum_client::{Client, ElectrumApi},
    BdkElectrumClient,
};
use bdk_wallet::{
    chain::ChainPosition,
    error::CreateTxError,
    file_store::Store as FileStore,
    template::Bip84,
    ChangeSet, KeychainKind, PersistedWallet, SignOptions, Wallet,
};
use bitcoin::{bip32::Xpriv, Address, Amount, Txid};
use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use zeroize::Zeroize;

const MAGIC: &[u8] = b"relaynode0";
const STOP_GAP: usize = 20;
const BATCH_SIZE: usize = 10;

type PW = PersistedWallet<FileStore<ChangeSet>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletBalance {
    pub confirmed: u64,
    pub trusted_pending: u64,
    pub untrusted_pending: u64,
    pub immature: u64,
}

impl WalletBalance {
    pub fn pending(&self) -> u64 { self.trusted_pending + self.untrusted_pending }
    pub fn total(&self) -> u64 { self.confirmed + self.pending() }
}

#[derive(Debug, Clone)]
pub struct TransactionDetails {
    pub txid: String,
    pub received: u64,
    pub sent: u64,
    pub fee: Option<u64>,
    pub confirmed: bool,
    pub timestamp: Option<u64>,
    pub block_height: Option<u32>,
}

/// One-line wallet overview for log output
#[derive(Debug, Clone)]
pub struct WalletSummary {
    pub network: Network,
    pub tip_height: u32,
    pub balance: WalletBalance,
    pub transactions: usize,
    pub receive_index: Option<u32>,
}

impl fmt::Display for WalletSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Wallet[{}] tip {} | confirmed {} sat, pending {} sat, immature {} sat | {} transactions | receive index {}",
            self.network,
            self.tip_height,
            self.balance.confirmed,
            self.balance.pending(),
            self.balance.immature,
            self.transactions,
            self.receive_index.map(|i| i.to_string()).unwrap_or_else(|| "none".into()),
        )
    }
}

pub struct BdkWallet {
    wallet: Mutex<PW>,
    db: Mutex<FileStore<ChangeSet>>,
    backend: Option<BdkElectrumClient<Client>>,
    network: Network,
}

impl BdkWallet {
    /// Create or load the wallet at `db_path` and connect to Electrum.
    pub fn open(seed: &WalletSeed, network: Network, db_path: &Path, electrum_url: &str) -> WalletResult<Self> {
        let mut wallet = Self::open_offline(seed, network, db_path)?;
        wallet.connect_electrum(electrum_url)?;
        Ok(wallet)
    }

    /// Create or load the wallet without any chain backend.
    pub fn open_offline(seed: &WalletSeed, network: Network, db_path: &Path) -> WalletResult<Self> {
        let (wallet, db) = Self::create_wallet(seed, network, db_path)?;
        Ok(Self { wallet: Mutex::new(wallet), db: Mutex::new(db), backend: None, network })
    }

    pub fn connect_electrum(&mut self, url: &str) -> WalletResult<()> {
        tracing::info!(url, network = %self.network, "Connecting to Electrum");
        let client = Client::new(url).map_err(|e| WalletError::Electrum(e.to_string()))?;
        self.backend = Some(BdkElectrumClient::new(client));
        Ok(())
    }

    pub fn is_online(&self) -> bool { self.backend.is_some() }
    pub fn network(&self) -> Network { self.network }

    fn create_wallet(seed: &WalletSeed, network: Network, db_path: &Path) -> WalletResult<(PW, FileStore<ChangeSet>)> {
        let mut bytes = seed.to_seed_bytes()?;
        let xprv = Xpriv::new_master(network.to_bdk(), &bytes)
            .map_err(|e| WalletError::KeyDerivation(e.to_string()));
        bytes.zeroize();
        let xprv = xprv?;

        let ext = Bip84(xprv, KeychainKind::External);
        let int = Bip84(xprv, KeychainKind::Internal);

        let mut db: FileStore<ChangeSet> = FileStore::load_or_create(MAGIC, db_path)
            .map_err(|e| WalletError::Store(e.to_string()))?
            .0;

        // Stored descriptors must match this seed; keys are extracted for signing
        let loaded = Wallet::load()
            .descriptor(KeychainKind::External, Some(ext.clone()))
            .descriptor(KeychainKind::Internal, Some(int.clone()))
            .extract_keys()
            .check_network(network.to_bdk())
            .load_wallet(&mut db)
            .map_err(|e| WalletError::Load(e.to_string()))?;

        let wallet = match loaded {
            Some(w) => w,
            None => {
                tracing::info!(path = %db_path.display(), "Creating new wallet store");
                Wallet::create(ext, int)
                    .network(network.to_bdk())
                    .create_wallet(&mut db)
                    .map_err(|e| WalletError::Create(e.to_string()))?
            }
        };

        Ok((wallet, db))
    }

    fn lock_wallet(&self) -> WalletResult<MutexGuard<'_, PW>> {
        self.wallet.lock().map_err(|_| WalletError::Lock)
    }

    fn client(&self) -> WalletResult<&BdkElectrumClient<Client>> {
        self.backend.as_ref().ok_or(WalletError::Offline)
    }

    fn persist(&self) -> WalletResult<()> {
        let mut wallet = self.lock_wallet()?;
        let mut db = self.db.lock().map_err(|_| WalletError::Lock)?;
        wallet.persist(&mut *db).map_err(|e| WalletError::Persist(e.to_string()))?;
        Ok(())
    }

    pub fn balance(&self) -> WalletResult<WalletBalance> {
        let wallet = self.lock_wallet()?;
        let b = wallet.balance();
        Ok(WalletBalance {
            confirmed: b.confirmed.to_sat(),
            trusted_pending: b.trusted_pending.to_sat(),
            untrusted_pending: b.untrusted_pending.to_sat(),
            immature: b.immature.to_sat(),
        })
    }

    /// Current receive address: first revealed address with no history, revealing one if needed.
    pub fn receive_address(&self) -> WalletResult<String> {
        let addr = {
            let mut wallet = self.lock_wallet()?;
            wallet.next_unused_address(KeychainKind::External).address.to_string()
        };
        self.persist()?;
        Ok(addr)
    }

    pub fn new_address(&self) -> WalletResult<String> {
        let addr = {
            let mut wallet = self.lock_wallet()?;
            wallet.reveal_next_address(KeychainKind::External).address.to_string()
        };
        self.persist()?;
        Ok(addr)
    }

    /// External address at `index` without revealing it.
    pub fn peek_address(&self, index: u32) -> WalletResult<String> {
        let wallet = self.lock_wallet()?;
        Ok(wallet.peek_address(KeychainKind::External, index).address.to_string())
    }

    pub fn summary(&self) -> WalletResult<WalletSummary> {
        let balance = self.balance()?;
        let wallet = self.lock_wallet()?;
        Ok(WalletSummary {
            network: self.network,
            tip_height: wallet.latest_checkpoint().height(),
            balance,
            transactions: wallet.transactions().count(),
            receive_index: wallet.derivation_index(KeychainKind::External),
        })
    }

    /// Incremental sync over revealed scripts, unconfirmed txs and the chain tip.
    pub fn sync(&self) -> WalletResult<()> {
        let client = self.client()?;
        {
            let mut wallet = self.lock_wallet()?;
            let request = wallet.start_sync_with_revealed_spks();
            let update = client.sync(request, BATCH_SIZE, false)
                .map_err(|e| WalletError::Sync(e.to_string()))?;
            wallet.apply_update(update).map_err(|e| WalletError::Sync(e.to_string()))?;
        }
        self.persist()
    }

    /// Full scan of both keychains up to the stop gap. `progress` sees every script checked.
    pub fn full_scan<F>(&self, mut progress: F) -> WalletResult<()>
    where
        F: FnMut(KeychainKind, u32) + Send + 'static,
    {
        let client = self.client()?;
        {
            let mut wallet = self.lock_wallet()?;
            let request = wallet
                .start_full_scan()
                .inspect(move |keychain, index, _| progress(keychain, index));
            let update = client.full_scan(request, STOP_GAP, BATCH_SIZE, false)
                .map_err(|e| WalletError::Sync(e.to_string()))?;
            wallet.apply_update(update).map_err(|e| WalletError::Sync(e.to_string()))?;
        }
        self.persist()
    }

    pub fn transactions(&self, limit: usize) -> WalletResult<Vec<TransactionDetails>> {
        let wallet = self.lock_wallet()?;
        Ok(wallet.transactions().take(limit).map(|tx| {
            let (confirmed, timestamp, block_height) = match tx.chain_position {
                ChainPosition::Confirmed { anchor, .. } =>
                    (true, Some(anchor.confirmation_time), Some(anchor.block_id.height)),
                ChainPosition::Unconfirmed { .. } => (false, None, None),
            };
            let (sent, received) = wallet.sent_and_received(&tx.tx_node.tx);
            TransactionDetails {
                txid: tx.tx_node.txid.to_string(),
                received: received.to_sat(),
                sent: sent.to_sat(),
                fee: wallet.calculate_fee(&tx.tx_node.tx).ok().map(|f| f.to_sat()),
                confirmed, timestamp, block_height,
            }
        }).collect())
    }

    /// Canonical transactions with their confirmation heights, plus the local tip.
    pub fn snapshot(&self) -> WalletResult<ChainSnapshot> {
        let wallet = self.lock_wallet()?;
        let transactions = wallet.transactions().map(|tx| {
            let (sent, received) = wallet.sent_and_received(&tx.tx_node.tx);
            let confirmation_height = match tx.chain_position {
                ChainPosition::Confirmed { anchor, .. } => Some(anchor.block_id.height),
                ChainPosition::Unconfirmed { .. } => None,
            };
            TxObservation { txid: tx.tx_node.txid, received, sent, confirmation_height }
        }).collect();
        Ok(ChainSnapshot { tip_height: wallet.latest_checkpoint().height(), transactions })
    }

    /// Pay exactly `amount` to `to` with an absolute `fee`, sign, broadcast.
    ///
    /// Coin selection and signing run before the backend is needed, so an offline
    /// wallet still reports `InsufficientFunds` and signing errors.
    pub fn send_with_fee(&self, to: &Address, amount: Amount, fee: Amount) -> WalletResult<Txid> {
        let tx = {
            let mut wallet = self.lock_wallet()?;
            let mut builder = wallet.build_tx();
            builder.add_recipient(to.script_pubkey(), amount);
            builder.fee_absolute(fee);

            let mut psbt = builder.finish().map_err(|e| match e {
                CreateTxError::CoinSelection(e) => WalletError::InsufficientFunds(e.to_string()),
                other => WalletError::Build(other.to_string()),
            })?;
            #[allow(deprecated)]
            let finalized = wallet.sign(&mut psbt, SignOptions::default())
                .map_err(|e| WalletError::Signing(e.to_string()))?;
            if !finalized {
                return Err(WalletError::Signing("transaction not fully signed".into()));
            }

            psbt.extract_tx().map_err(|e| WalletError::Extract(e.to_string()))?
        };

        let txid = tx.compute_txid();
        self.client()?.inner.transaction_broadcast(&tx)
            .map_err(|e| WalletError::Broadcast(e.to_string()))?;

        // Spent outputs must not be selected again before the next sync sees the tx
        let seen_at = chrono::Utc::now().timestamp().max(0) as u64;
        self.lock_wallet()?.apply_unconfirmed_txs([(tx, seen_at)]);
        self.persist()?;
        Ok(txid)
    }
}

impl ChainSource for BdkWallet {
    fn refresh(&self) -> WalletResult<()> { self.sync() }
    fn snapshot(&self) -> WalletResult<ChainSnapshot> { BdkWallet::snapshot(self) }
}

impl ForwardingWallet for BdkWallet {
    fn forward(&self, to: &Address, amount: Amount, fee: Amount) -> WalletResult<Txid> {
        self.send_with_fee(to, amount, fee)
    }
}
