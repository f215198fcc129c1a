//! Wallet provider capability.
//!
//! [`WalletProvider`] is the EIP-1193 surface the session needs: account
//! access, chain switching, permission revocation, transaction submission and
//! the `accountsChanged` / `chainChanged` event stream. [`Eip1193Client`]
//! speaks it as JSON-RPC over HTTP to a wallet endpoint; the host that bridges
//! the wallet's events forwards them with [`Eip1193Client::emit`].

use crate::config::{ChainDescriptor, ClientConfig};
use crate::error::{ClientError, Result};
use crate::rpc::{parse_quantity, JsonRpcTransport};
use crate::types::{TransactionHash, TransactionRequest};
use async_trait::async_trait;
use ethers::types::Address;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Capacity of the wallet event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Event pushed by the wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// `accountsChanged`; an empty list means the wallet disconnected
    AccountsChanged(Vec<Address>),
    /// `chainChanged`
    ChainChanged(u64),
}

/// EIP-1193 wallet surface
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// `eth_requestAccounts`
    async fn request_accounts(&self) -> Result<Vec<Address>>;

    /// `eth_chainId`
    async fn chain_id(&self) -> Result<u64>;

    /// `wallet_switchEthereumChain`
    async fn switch_chain(&self, chain_id: u64) -> Result<()>;

    /// `wallet_addEthereumChain`
    async fn add_chain(&self, chain: &ChainDescriptor) -> Result<()>;

    /// `wallet_revokePermissions` for `eth_accounts`
    async fn revoke_permissions(&self) -> Result<()>;

    /// `eth_sendTransaction`, returns the transaction hash
    async fn send_transaction(&self, request: &TransactionRequest) -> Result<TransactionHash>;

    /// Subscribe to account and chain change events
    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;
}

/// Wallet reached through JSON-RPC over HTTP
#[derive(Clone, Debug)]
pub struct Eip1193Client {
    transport: JsonRpcTransport,
    events: broadcast::Sender<WalletEvent>,
}

impl Eip1193Client {
    /// Create a client for the configured wallet endpoint
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let url = config
            .wallet_url
            .as_deref()
            .ok_or(ClientError::WalletUnavailable)?;
        Self::with_url(url, config)
    }

    /// Create a client for an explicit wallet endpoint
    pub fn with_url(url: &str, config: &ClientConfig) -> Result<Self> {
        let transport = JsonRpcTransport::new(url, config.request_timeout())?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self { transport, events })
    }

    /// Forward an event received from the wallet to subscribers
    pub fn emit(&self, event: WalletEvent) {
        debug!("Wallet event: {:?}", event);
        // No subscribers simply means no session is listening yet
        let _ = self.events.send(event);
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        self.transport
            .call(method, params)
            .await
            .map_err(|e| match e {
                ClientError::RpcError { code, message } => ClientError::from_provider(code, message),
                ClientError::NetworkError(err) if err.is_connect() => {
                    ClientError::WalletUnavailable
                }
                other => other,
            })
    }
}

#[async_trait]
impl WalletProvider for Eip1193Client {
    async fn request_accounts(&self) -> Result<Vec<Address>> {
        info!("Requesting wallet accounts");
        let result = self.request("eth_requestAccounts", json!([])).await?;
        serde_json::from_value(result).map_err(ClientError::SerializationError)
    }

    async fn chain_id(&self) -> Result<u64> {
        let result = self.request("eth_chainId", json!([])).await?;
        let quantity = result.as_str().ok_or_else(|| {
            ClientError::InvalidResponse("Missing chain id in wallet response".to_string())
        })?;
        parse_quantity(quantity)
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<()> {
        info!("Switching wallet to chain {}", chain_id);
        self.request(
            "wallet_switchEthereumChain",
            json!([{ "chainId": format!("{:#x}", chain_id) }]),
        )
        .await?;
        Ok(())
    }

    async fn add_chain(&self, chain: &ChainDescriptor) -> Result<()> {
        info!("Adding chain {} to wallet", chain.chain_name);
        self.request(
            "wallet_addEthereumChain",
            json!([{
                "chainId": chain.hex_chain_id(),
                "chainName": chain.chain_name,
                "rpcUrls": chain.rpc_urls,
                "nativeCurrency": {
                    "name": chain.native_currency.name,
                    "symbol": chain.native_currency.symbol,
                    "decimals": chain.native_currency.decimals,
                },
                "blockExplorerUrls": chain.block_explorer_urls,
            }]),
        )
        .await?;
        Ok(())
    }

    async fn revoke_permissions(&self) -> Result<()> {
        self.request("wallet_revokePermissions", json!([{ "eth_accounts": {} }]))
            .await?;
        Ok(())
    }

    async fn send_transaction(&self, request: &TransactionRequest) -> Result<TransactionHash> {
        info!("Sending transaction from {:?} to {:?}", request.from, request.to);
        let result = self.request("eth_sendTransaction", json!([request])).await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ClientError::InvalidResponse("Missing transaction hash".to_string()))
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn config() -> ClientConfig {
        ClientConfig::harmony_mainnet(
            Address::from_low_u64_be(0xda0),
            Address::from_low_u64_be(0x707),
        )
    }

    #[test]
    fn test_client_requires_wallet_url() {
        assert_matches!(
            Eip1193Client::new(&config()),
            Err(ClientError::WalletUnavailable)
        );

        let config = config().with_wallet_url("http://127.0.0.1:1248");
        assert!(Eip1193Client::new(&config).is_ok());
    }

    #[tokio::test]
    async fn test_emit_reaches_subscribers() {
        let config = config().with_wallet_url("http://127.0.0.1:1248");
        let client = Eip1193Client::new(&config).unwrap();

        // Emitting before anyone listens is a no-op
        client.emit(WalletEvent::ChainChanged(1));

        let mut events = client.subscribe();
        client.emit(WalletEvent::AccountsChanged(vec![]));
        assert_eq!(
            events.recv().await.unwrap(),
            WalletEvent::AccountsChanged(vec![])
        );
    }
}
