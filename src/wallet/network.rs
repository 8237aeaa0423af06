//! Network - Parameter set selection and per-network naming

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network { #[default] Bitcoin, Testnet, Signet, Regtest }

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self { Network::Bitcoin => "bitcoin", Network::Testnet => "testnet", Network::Signet => "signet", Network::Regtest => "regtest" }
    }

    /// Forwarding-service selector: exactly `testnet` or `regtest`, anything else is mainnet.
    pub fn from_selector(arg: Option<&str>) -> Self {
        match arg {
            Some("testnet") => Network::Testnet,
            Some("regtest") => Network::Regtest,
            _ => Network::Bitcoin,
        }
    }

    /// Lenient parse for `--network` flags and env values.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bitcoin" | "mainnet" | "main" => Some(Network::Bitcoin),
            "testnet" | "testnet3" | "test" => Some(Network::Testnet),
            "signet" => Some(Network::Signet),
            "regtest" => Some(Network::Regtest),
            _ => None,
        }
    }

    pub fn to_bdk(&self) -> bitcoin::Network {
        match self { Network::Bitcoin => bitcoin::Network::Bitcoin, Network::Testnet => bitcoin::Network::Testnet, Network::Signet => bitcoin::Network::Signet, Network::Regtest => bitcoin::Network::Regtest }
    }

    /// `base` on mainnet, `base-<network>` elsewhere.
    pub fn file_prefix(&self, base: &str) -> String {
        match self {
            Network::Bitcoin => base.to_string(),
            other => format!("{}-{}", base, other.as_str()),
        }
    }

    /// Regtest talks to a node on this machine instead of public servers.
    pub fn connects_to_localhost(&self) -> bool { matches!(self, Network::Regtest) }

    pub fn default_electrum_url(&self) -> &'static str {
        match self {
            Network::Bitcoin => "ssl://electrum.blockstream.info:50002",
            Network::Testnet => "ssl://electrum.blockstream.info:60002",
            Network::Signet => "ssl://mempool.space:60602",
            Network::Regtest => "tcp://127.0.0.1:60401",
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}
