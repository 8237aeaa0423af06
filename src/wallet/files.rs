//! WalletFiles - `<prefix>.wallet` and `<prefix>.seed.json` in one directory
//!
//! The BDK file store holds both the local chain (checkpoints, our "chain index")
//! and the wallet's tx graph and keychain indices.

use crate::seed::SeedStore;
use std::io;
use std::path::{Path, PathBuf};

pub const WALLET_EXT: &str = "wallet";
pub const SEED_EXT: &str = "seed.json";

#[derive(Debug, Clone)]
pub struct WalletFiles {
    dir: PathBuf,
    prefix: String,
}

impl WalletFiles {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self { dir: dir.into(), prefix: prefix.into() }
    }

    pub fn dir(&self) -> &Path { &self.dir }
    pub fn prefix(&self) -> &str { &self.prefix }
    pub fn wallet_path(&self) -> PathBuf { self.dir.join(format!("{}.{}", self.prefix, WALLET_EXT)) }
    pub fn seed_path(&self) -> PathBuf { self.dir.join(format!("{}.{}", self.prefix, SEED_EXT)) }
    pub fn seed_store(&self) -> SeedStore { SeedStore::new(self.seed_path()) }

    /// Delete the chain/wallet store so the next open rescans from scratch.
    /// Returns whether a file was removed. The seed backup is left alone.
    pub fn reset_chain(&self) -> io::Result<bool> {
        match std::fs::remove_file(self.wallet_path()) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}
