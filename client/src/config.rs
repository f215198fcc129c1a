//! Client configuration: target chain, node and wallet endpoints, contract
//! addresses and polling limits.
//!
//! A configuration can be built in code from the [`ClientConfig::harmony_mainnet`]
//! preset with the `with_*` builders, or loaded from a TOML file where any key
//! may be overridden by a `VRDAO_*` environment variable.

use crate::error::{ClientError, Result};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Harmony Mainnet shard 0
pub const HARMONY_CHAIN_ID: u64 = 1_666_600_000;

/// Native currency descriptor used when adding a chain to a wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    /// Currency name
    pub name: String,
    /// Ticker, 2-6 characters
    pub symbol: String,
    /// Decimals
    pub decimals: u8,
}

/// Chain descriptor handed to `wallet_addEthereumChain`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDescriptor {
    /// Numeric chain id
    pub chain_id: u64,
    /// Human readable chain name
    pub chain_name: String,
    /// Public RPC endpoints
    pub rpc_urls: Vec<String>,
    /// Native currency
    pub native_currency: NativeCurrency,
    /// Block explorer URLs
    pub block_explorer_urls: Vec<String>,
}

impl ChainDescriptor {
    /// Harmony Mainnet
    pub fn harmony_mainnet() -> Self {
        Self {
            chain_id: HARMONY_CHAIN_ID,
            chain_name: "Harmony Mainnet".to_string(),
            rpc_urls: vec!["https://api.harmony.one".to_string()],
            native_currency: NativeCurrency {
                name: "ONE".to_string(),
                symbol: "ONE".to_string(),
                decimals: 18,
            },
            block_explorer_urls: vec!["https://explorer.harmony.one/".to_string()],
        }
    }

    /// Chain id as the 0x-prefixed hex quantity wallets expect
    pub fn hex_chain_id(&self) -> String {
        format!("{:#x}", self.chain_id)
    }
}

/// Configuration for the governance client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Chain the wallet must be on
    pub chain: ChainDescriptor,

    /// Node JSON-RPC endpoint used for reads and receipts
    pub rpc_url: String,

    /// Wallet provider JSON-RPC endpoint; `None` means no wallet is injected
    #[serde(default)]
    pub wallet_url: Option<String>,

    /// Governance contract
    pub dao_address: Address,

    /// Governance token contract
    pub token_address: Address,

    /// HTTP request timeout (in milliseconds)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Upper bound on proposal indices scanned per fetch
    #[serde(default = "default_max_proposals")]
    pub max_proposals: u64,

    /// First receipt poll interval (in milliseconds)
    #[serde(default = "default_tx_poll_interval_ms")]
    pub tx_poll_interval_ms: u64,

    /// Largest receipt poll interval (in milliseconds)
    #[serde(default = "default_tx_max_poll_interval_ms")]
    pub tx_max_poll_interval_ms: u64,

    /// Transaction confirmation timeout (in seconds)
    #[serde(default = "default_tx_timeout_secs")]
    pub tx_timeout_secs: u64,

    /// Refuse to submit votes or closes the local role checks consider unauthorized
    #[serde(default)]
    pub strict_authorization: bool,
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_max_proposals() -> u64 {
    256
}

fn default_tx_poll_interval_ms() -> u64 {
    1000
}

fn default_tx_max_poll_interval_ms() -> u64 {
    8000
}

fn default_tx_timeout_secs() -> u64 {
    120
}

impl ClientConfig {
    /// Create a configuration for the given chain and contracts
    pub fn new(
        chain: ChainDescriptor,
        rpc_url: String,
        dao_address: Address,
        token_address: Address,
    ) -> Self {
        Self {
            chain,
            rpc_url,
            wallet_url: None,
            dao_address,
            token_address,
            request_timeout_ms: default_request_timeout_ms(),
            max_proposals: default_max_proposals(),
            tx_poll_interval_ms: default_tx_poll_interval_ms(),
            tx_max_poll_interval_ms: default_tx_max_poll_interval_ms(),
            tx_timeout_secs: default_tx_timeout_secs(),
            strict_authorization: false,
        }
    }

    /// Harmony Mainnet against its public RPC endpoint
    pub fn harmony_mainnet(dao_address: Address, token_address: Address) -> Self {
        let chain = ChainDescriptor::harmony_mainnet();
        let rpc_url = chain.rpc_urls[0].clone();
        Self::new(chain, rpc_url, dao_address, token_address)
    }

    /// Load a configuration file, letting `VRDAO_*` environment variables
    /// override individual keys (`VRDAO_RPC_URL`, `VRDAO_CHAIN__CHAIN_ID`, ...)
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(
                config::Environment::with_prefix("VRDAO")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ClientError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: ClientConfig = settings
            .try_deserialize()
            .map_err(|e| ClientError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ClientConfig = toml::from_str(content)
            .map_err(|e| ClientError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Set the wallet provider endpoint
    pub fn with_wallet_url(mut self, wallet_url: impl Into<String>) -> Self {
        self.wallet_url = Some(wallet_url.into());
        self
    }

    /// Set request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the proposal scan bound
    pub fn with_max_proposals(mut self, max_proposals: u64) -> Self {
        self.max_proposals = max_proposals;
        self
    }

    /// Set transaction polling configuration
    pub fn with_tx_config(
        mut self,
        poll_interval_ms: u64,
        max_poll_interval_ms: u64,
        timeout_secs: u64,
    ) -> Self {
        self.tx_poll_interval_ms = poll_interval_ms;
        self.tx_max_poll_interval_ms = max_poll_interval_ms;
        self.tx_timeout_secs = timeout_secs;
        self
    }

    /// Hard-block submissions the local role checks consider unauthorized
    pub fn with_strict_authorization(mut self, strict: bool) -> Self {
        self.strict_authorization = strict;
        self
    }

    /// HTTP request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.is_empty() {
            return Err(ClientError::ConfigError(
                "RPC URL cannot be empty".to_string(),
            ));
        }
        Url::parse(&self.rpc_url)?;

        if let Some(wallet_url) = &self.wallet_url {
            Url::parse(wallet_url)?;
        }
        if self.chain.chain_id == 0 {
            return Err(ClientError::ConfigError(
                "Chain id must be greater than 0".to_string(),
            ));
        }
        if self.dao_address.is_zero() {
            return Err(ClientError::ConfigError(
                "DAO contract address cannot be the zero address".to_string(),
            ));
        }
        if self.token_address.is_zero() {
            return Err(ClientError::ConfigError(
                "Token contract address cannot be the zero address".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(ClientError::ConfigError(
                "Request timeout must be greater than 0".to_string(),
            ));
        }
        if self.max_proposals == 0 {
            return Err(ClientError::ConfigError(
                "Max proposals must be greater than 0".to_string(),
            ));
        }
        if self.tx_poll_interval_ms == 0 {
            return Err(ClientError::ConfigError(
                "Transaction poll interval must be greater than 0".to_string(),
            ));
        }
        if self.tx_max_poll_interval_ms < self.tx_poll_interval_ms {
            return Err(ClientError::ConfigError(
                "Max poll interval must not be below the poll interval".to_string(),
            ));
        }
        if self.tx_timeout_secs == 0 {
            return Err(ClientError::ConfigError(
                "Transaction timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
