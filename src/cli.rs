//! Command-line arguments for the three binaries

use crate::tools::{BackupOptions, RestoreOptions, RESTORE_CREATION_TIME, RESTORE_MNEMONIC};
use crate::wallet::Network;
use clap::Parser;
use std::path::PathBuf;

pub const USAGE: &str = "Usage: forwarding-service <address-to-send-back-to> [regtest|testnet]";

#[derive(Parser, Debug)]
#[command(name = "forwarding-service")]
#[command(about = "Forward received coins, minus a fee, to a fixed address", long_about = None)]
pub struct ForwardArgs {
    /// Address that received coins are forwarded to
    pub address: Option<String>,

    /// `testnet` or `regtest`; anything else selects mainnet
    pub network: Option<String>,
}

/// What `forwarding-service` was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Usage,
    Run { destination: String, selector: Option<String> },
}

impl ForwardArgs {
    pub fn invocation(self) -> Invocation {
        match self.address {
            None => Invocation::Usage,
            Some(destination) => Invocation::Run { destination, selector: self.network },
        }
    }
}

/// Missing destination: report the usage line through the logger, not stdout.
pub fn log_usage() {
    tracing::error!("{}", USAGE);
}

fn parse_network(value: &str) -> Result<Network, String> {
    Network::parse(value).ok_or_else(|| format!("unknown network {:?}", value))
}

#[derive(Parser, Debug)]
#[command(name = "restore-from-seed")]
#[command(about = "Restore a wallet from mnemonic words and rescan the chain", long_about = None)]
pub struct RestoreArgs {
    #[arg(short, long, default_value = RESTORE_MNEMONIC)]
    pub mnemonic: String,

    #[arg(short, long, default_value = "")]
    pub passphrase: String,

    /// Seed creation time, seconds since the Unix epoch
    #[arg(short, long, default_value_t = RESTORE_CREATION_TIME)]
    pub created: u64,

    #[arg(short, long, default_value = "testnet", value_parser = parse_network)]
    pub network: Network,

    /// Electrum server; defaults to the network's public server
    #[arg(short, long)]
    pub electrum: Option<String>,

    #[arg(short, long, default_value = ".")]
    pub data_dir: PathBuf,
}

impl RestoreArgs {
    pub fn options(self) -> RestoreOptions {
        RestoreOptions {
            mnemonic: self.mnemonic,
            passphrase: self.passphrase,
            creation_time: self.created,
            network: self.network,
            data_dir: self.data_dir,
            electrum_url: self.electrum,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "backup-to-seed")]
#[command(about = "Create a wallet and write down its seed", long_about = None)]
pub struct BackupArgs {
    #[arg(short, long, default_value = "testnet", value_parser = parse_network)]
    pub network: Network,

    #[arg(short, long, default_value = ".")]
    pub data_dir: PathBuf,
}

impl BackupArgs {
    pub fn options(self) -> BackupOptions {
        BackupOptions { network: self.network, data_dir: self.data_dir }
    }
}
