//! SeedStore - JSON seed backup next to the wallet file

use super::{SeedError, SeedResult, WalletSeed};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use zeroize::{Zeroize, ZeroizeOnDrop};

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct SeedFile {
    mnemonic: String,
    #[serde(default)]
    passphrase: String,
    creation_time: u64,
}

pub struct SeedStore {
    path: PathBuf,
}

impl SeedStore {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }
    pub fn path(&self) -> &Path { &self.path }
    pub fn exists(&self) -> bool { self.path.exists() }

    pub fn load(&self) -> SeedResult<WalletSeed> {
        let file = File::open(&self.path).map_err(|source| self.io(source))?;
        let stored: SeedFile = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| SeedError::Malformed { path: self.path.clone(), source })?;
        WalletSeed::from_phrase(&stored.mnemonic, &stored.passphrase, stored.creation_time)
    }

    /// Write a new backup. Never overwrites an existing file.
    pub fn save(&self, seed: &WalletSeed) -> SeedResult<()> {
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options.open(&self.path).map_err(|source| match source.kind() {
            std::io::ErrorKind::AlreadyExists => SeedError::AlreadyExists(self.path.clone()),
            _ => self.io(source),
        })?;

        let stored = SeedFile {
            mnemonic: seed.mnemonic_code().to_string(),
            passphrase: seed.passphrase().to_string(),
            creation_time: seed.creation_time(),
        };
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &stored)
            .map_err(|source| SeedError::Malformed { path: self.path.clone(), source })?;
        writer.flush().map_err(|source| self.io(source))?;
        Ok(())
    }

    /// Load the backup if present, else generate a fresh seed and save it.
    /// The flag is true when a new seed was created.
    pub fn load_or_generate(&self) -> SeedResult<(WalletSeed, bool)> {
        if self.exists() {
            return Ok((self.load()?, false));
        }
        let seed = WalletSeed::generate_now()?;
        self.save(&seed)?;
        tracing::info!(path = %self.path.display(), "Generated new wallet seed");
        Ok((seed, true))
    }

    fn io(&self, source: std::io::Error) -> SeedError {
        SeedError::Io { path: self.path.clone(), source }
    }
}
