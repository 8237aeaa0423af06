//! Node Configuration - built by the binary, overridable from the environment

use crate::forward::FailurePolicy;
use crate::wallet::{Network, WalletFiles};
use bitcoin::Amount;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const FILE_PREFIX: &str = "forwarding-service";
/// Flat fee taken from every forward (0.05 mBTC).
pub const DEFAULT_FEE_SAT: u64 = 5_000;
pub const DEFAULT_CONFIRMATIONS: u32 = 1;
pub const DEFAULT_POLL_SECS: u64 = 30;

pub const ENV_DATA_DIR: &str = "RELAYNODE_DATA_DIR";
pub const ENV_ELECTRUM_URL: &str = "RELAYNODE_ELECTRUM_URL";
pub const ENV_FEE_SAT: &str = "RELAYNODE_FEE_SAT";
pub const ENV_CONFIRMATIONS: &str = "RELAYNODE_CONFIRMATIONS";
pub const ENV_POLL_SECS: &str = "RELAYNODE_POLL_SECS";
pub const ENV_FAILURE_POLICY: &str = "RELAYNODE_FAILURE_POLICY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("{0}")]
    Invalid(String),
}

/// Forwarding daemon configuration. The binary constructs this from its arguments.
#[derive(Debug, Clone)]
pub struct ForwardConfig {
    pub network: Network,
    pub data_dir: PathBuf,
    pub file_prefix: String,
    pub electrum_url: Option<String>,
    pub fee: Amount,
    pub confirmations: u32,
    pub poll_interval: Duration,
    pub failure_policy: FailurePolicy,
}

impl Default for ForwardConfig {
    fn default() -> Self { Self::new(Network::default()) }
}

impl ForwardConfig {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            data_dir: PathBuf::from("."),
            file_prefix: network.file_prefix(FILE_PREFIX),
            electrum_url: None,
            fee: Amount::from_sat(DEFAULT_FEE_SAT),
            confirmations: DEFAULT_CONFIRMATIONS,
            poll_interval: Duration::from_secs(DEFAULT_POLL_SECS),
            failure_policy: FailurePolicy::default(),
        }
    }

    /// From the daemon's `[regtest|testnet]` argument.
    pub fn for_selector(selector: Option<&str>) -> Self { Self::new(Network::from_selector(selector)) }

    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self { self.data_dir = path.into(); self }
    pub fn with_electrum(mut self, url: impl Into<String>) -> Self { self.electrum_url = Some(url.into()); self }
    pub fn with_fee(mut self, fee: Amount) -> Self { self.fee = fee; self }
    pub fn with_confirmations(mut self, depth: u32) -> Self { self.confirmations = depth; self }
    pub fn with_poll_interval(mut self, interval: Duration) -> Self { self.poll_interval = interval; self }
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self { self.failure_policy = policy; self }

    /// Override if set, else the network default (localhost on regtest).
    pub fn electrum_url(&self) -> &str {
        self.electrum_url.as_deref().unwrap_or_else(|| self.network.default_electrum_url())
    }

    pub fn files(&self) -> WalletFiles { WalletFiles::new(&self.data_dir, &self.file_prefix) }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.confirmations == 0 {
            return Err(ConfigError::Invalid("confirmations must be at least 1".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid("poll interval must be positive".into()));
        }
        Ok(())
    }

    /// Apply `RELAYNODE_*` overrides from the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    pub fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(dir) = get(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(url) = get(ENV_ELECTRUM_URL) {
            self.electrum_url = Some(url);
        }
        if let Some(value) = get(ENV_FEE_SAT) {
            let sat = value.parse::<u64>().map_err(|_| ConfigError::InvalidValue { key: ENV_FEE_SAT, value })?;
            self.fee = Amount::from_sat(sat);
        }
        if let Some(value) = get(ENV_CONFIRMATIONS) {
            self.confirmations = value.parse().map_err(|_| ConfigError::InvalidValue { key: ENV_CONFIRMATIONS, value })?;
        }
        if let Some(value) = get(ENV_POLL_SECS) {
            let secs = value.parse::<u64>().map_err(|_| ConfigError::InvalidValue { key: ENV_POLL_SECS, value })?;
            self.poll_interval = Duration::from_secs(secs);
        }
        if let Some(value) = get(ENV_FAILURE_POLICY) {
            self.failure_policy = FailurePolicy::parse(&value)
                .ok_or(ConfigError::InvalidValue { key: ENV_FAILURE_POLICY, value })?;
        }
        Ok(self)
    }
}

/// Load `KEY=value` lines from a dotenv file into the environment. Existing
/// variables win. A missing file is not an error; returns how many were set.
pub fn load_dotenv(path: impl AsRef<Path>) -> usize {
    let Ok(contents) = std::fs::read_to_string(path) else { return 0 };
    let mut set = 0;
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim().trim_matches('"');
            if !key.is_empty() && !value.is_empty() && std::env::var(key).is_err() {
                std::env::set_var(key, value);
                set += 1;
            }
        }
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_selector_defaults() {
        let main = ForwardConfig::for_selector(None);
        assert_eq!(main.network, Network::Bitcoin);
        assert_eq!(main.file_prefix, "forwarding-service");

        let test = ForwardConfig::for_selector(Some("testnet"));
        assert_eq!(test.network, Network::Testnet);
        assert_eq!(test.file_prefix, "forwarding-service-testnet");

        let reg = ForwardConfig::for_selector(Some("regtest"));
        assert_eq!(reg.network, Network::Regtest);
        assert_eq!(reg.file_prefix, "forwarding-service-regtest");
        assert!(reg.electrum_url().starts_with("tcp://127.0.0.1"));

        let other = ForwardConfig::for_selector(Some("mainnet-please"));
        assert_eq!(other.network, Network::Bitcoin);
    }

    #[test]
    fn test_defaults() {
        let config = ForwardConfig::default();
        assert_eq!(config.fee, Amount::from_sat(DEFAULT_FEE_SAT));
        assert_eq!(config.confirmations, 1);
        assert_eq!(config.failure_policy, FailurePolicy::LogAndDrop);
        assert_eq!(config.data_dir, PathBuf::from("."));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = ForwardConfig::for_selector(Some("testnet"))
            .apply_env_from(env(&[
                (ENV_DATA_DIR, "/var/lib/relay"),
                (ENV_ELECTRUM_URL, "tcp://electrs:50001"),
                (ENV_FEE_SAT, "2000"),
                (ENV_CONFIRMATIONS, "3"),
                (ENV_POLL_SECS, "5"),
                (ENV_FAILURE_POLICY, "escalate"),
            ]))
            .expect("valid env");

        assert_eq!(config.data_dir, PathBuf::from("/var/lib/relay"));
        assert_eq!(config.electrum_url(), "tcp://electrs:50001");
        assert_eq!(config.fee, Amount::from_sat(2_000));
        assert_eq!(config.confirmations, 3);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.failure_policy, FailurePolicy::Escalate);
        assert_eq!(
            config.files().wallet_path(),
            PathBuf::from("/var/lib/relay/forwarding-service-testnet.wallet")
        );
    }

    #[test]
    fn test_env_blank_values_ignored() {
        let config = ForwardConfig::default().apply_env_from(env(&[(ENV_FEE_SAT, "  ")])).expect("ok");
        assert_eq!(config.fee, Amount::from_sat(DEFAULT_FEE_SAT));
    }

    #[test]
    fn test_env_invalid_values() {
        let err = ForwardConfig::default().apply_env_from(env(&[(ENV_FEE_SAT, "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: ENV_FEE_SAT, .. }));
        let err = ForwardConfig::default().apply_env_from(env(&[(ENV_FAILURE_POLICY, "retry")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: ENV_FAILURE_POLICY, .. }));
    }

    #[test]
    fn test_validate() {
        assert!(ForwardConfig::default().with_confirmations(0).validate().is_err());
        assert!(ForwardConfig::default().with_poll_interval(Duration::ZERO).validate().is_err());
    }
}
