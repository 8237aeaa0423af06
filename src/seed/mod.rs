//! Seed - Mnemonic words, passphrase and birthday. Every wallet key derives from here.
//!
//! A [`WalletSeed`] is immutable once built. The BIP39 phrase and passphrase are
//! zeroized on drop and never appear in `Debug` or `Display` output; callers that
//! need the words (backup logging) ask for them explicitly.

mod store;

pub use store::SeedStore;

use bip39::Mnemonic;
use bitcoin::bip32::{Fingerprint, Xpriv};
use bitcoin::secp256k1::Secp256k1;
use bitcoin::NetworkKind;
use chrono::{DateTime, Utc};
use rand::RngCore;
use std::fmt;
use std::path::PathBuf;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Words in a freshly generated mnemonic (128 bits of entropy).
pub const GENERATED_WORDS: usize = 12;

const ENTROPY_BYTES: usize = 16;

/// Errors while building, deriving or storing a seed
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),
    #[error("Derivation failed: {0}")]
    DerivationFailed(String),
    #[error("Seed file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Seed file {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Seed file {0} already exists, refusing to overwrite")]
    AlreadyExists(PathBuf),
}

pub type SeedResult<T> = Result<T, SeedError>;

/// Mnemonic phrase + passphrase + creation time (unix seconds).
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct WalletSeed {
    phrase: String,
    passphrase: String,
    creation_time: u64,
}

impl WalletSeed {
    /// Parse and normalize an existing phrase. Fails on unknown words or a bad checksum.
    pub fn from_phrase(phrase: &str, passphrase: &str, creation_time: u64) -> SeedResult<Self> {
        let mnemonic = Mnemonic::parse_normalized(phrase)
            .map_err(|e| SeedError::InvalidMnemonic(e.to_string()))?;
        Ok(Self {
            phrase: mnemonic.to_string(),
            passphrase: passphrase.to_string(),
            creation_time,
        })
    }

    /// Fresh seed from OS randomness, no passphrase.
    pub fn generate(creation_time: u64) -> SeedResult<Self> {
        let mut entropy = [0u8; ENTROPY_BYTES];
        rand::thread_rng().fill_bytes(&mut entropy);
        let mnemonic = Mnemonic::from_entropy(&entropy)
            .map_err(|e| SeedError::InvalidMnemonic(e.to_string()));
        entropy.zeroize();
        Ok(Self { phrase: mnemonic?.to_string(), passphrase: String::new(), creation_time })
    }

    /// Fresh seed stamped with the current time.
    pub fn generate_now() -> SeedResult<Self> {
        Self::generate(Utc::now().timestamp().max(0) as u64)
    }

    pub fn words(&self) -> Vec<&str> { self.phrase.split_whitespace().collect() }
    pub fn mnemonic_code(&self) -> &str { &self.phrase }
    pub fn passphrase(&self) -> &str { &self.passphrase }
    pub fn creation_time(&self) -> u64 { self.creation_time }

    pub fn creation_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(i64::try_from(self.creation_time).ok()?, 0)
    }

    /// 64-byte BIP39 seed (PBKDF2 over phrase and passphrase).
    pub fn to_seed_bytes(&self) -> SeedResult<[u8; 64]> {
        let mnemonic = Mnemonic::parse_normalized(&self.phrase)
            .map_err(|e| SeedError::InvalidMnemonic(e.to_string()))?;
        Ok(mnemonic.to_seed(&self.passphrase))
    }

    /// BIP32 master key fingerprint. Safe to log, identifies the seed without revealing it.
    pub fn fingerprint(&self) -> SeedResult<Fingerprint> {
        let mut seed = self.to_seed_bytes()?;
        let xprv = Xpriv::new_master(NetworkKind::Main, &seed)
            .map_err(|e| SeedError::DerivationFailed(e.to_string()));
        seed.zeroize();
        Ok(xprv?.fingerprint(&Secp256k1::new()))
    }
}

impl fmt::Debug for WalletSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletSeed")
            .field("words", &self.words().len())
            .field("passphrase", &!self.passphrase.is_empty())
            .field("creation_time", &self.creation_time)
            .finish()
    }
}

impl fmt::Display for WalletSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fingerprint = self.fingerprint().map(|fp| fp.to_string()).unwrap_or_else(|_| "?".into());
        write!(f, "WalletSeed{{unencrypted, {} words, fingerprint {}}}", self.words().len(), fingerprint)
    }
}
