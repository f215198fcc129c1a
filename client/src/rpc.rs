//! JSON-RPC plumbing: the raw transport the wallet endpoint speaks and the
//! ethers-backed node client used for contract reads and receipts.
//!
//! Every call is a single HTTP POST: there is no retry layer, a failed request
//! surfaces to the caller, which decides whether the user should try again.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::types::{TransactionReceipt, TransactionStatus};
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{
    Address, BlockId, BlockNumber, TransactionReceipt as NodeReceipt,
    TransactionRequest as CallRequest, H256, U256,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

/// JSON-RPC request ID type
type RequestId = u64;

/// JSON-RPC request
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: RequestId,
    method: &'a str,
    params: Value,
}

/// JSON-RPC response
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct JsonRpcResponse {
    jsonrpc: String,
    id: Value,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// HTTP JSON-RPC 2.0 transport for the wallet endpoint
#[derive(Clone, Debug)]
pub struct JsonRpcTransport {
    /// HTTP client
    client: Client,
    /// Endpoint URL
    url: String,
    /// Request ID counter
    request_id: Arc<AtomicU64>,
}

impl JsonRpcTransport {
    /// Create a transport for `url`
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::NetworkError)?;

        Ok(Self {
            client,
            url: url.to_string(),
            request_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Get next request ID
    fn next_request_id(&self) -> RequestId {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Make a JSON-RPC call and return its `result`.
    ///
    /// A `null` result is returned as `Value::Null`; callers decide whether
    /// that is meaningful (pending receipts) or malformed.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let request_id = self.next_request_id();

        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: request_id,
            method,
            params,
        };

        debug!("JSON-RPC request: {} (id: {})", method, request_id);

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(ClientError::NetworkError)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::InvalidResponse(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let rpc_response: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        if let Some(error) = rpc_response.error {
            error!(
                "JSON-RPC error from {}: {} (code: {})",
                method, error.message, error.code
            );
            return Err(ClientError::RpcError {
                code: error.code,
                message: error.message,
            });
        }

        Ok(rpc_response.result.unwrap_or(Value::Null))
    }
}

/// Parse a 0x-prefixed hex quantity
pub fn parse_quantity(value: &str) -> Result<u64> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| ClientError::InvalidResponse(format!("Not a hex quantity: {}", value)))?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| ClientError::InvalidResponse(format!("Bad quantity {}: {}", value, e)))
}

/// Node client for contract reads, receipts and health checks
#[derive(Clone, Debug)]
pub struct NodeClient {
    provider: Provider<Http>,
}

impl NodeClient {
    /// Create a node client from the configured RPC endpoint
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let url = Url::parse(&config.rpc_url)?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(ClientError::NetworkError)?;

        Ok(Self {
            provider: Provider::new(Http::new_with_client(url, client)),
        })
    }

    /// Execute a read-only contract call against the latest block
    pub async fn eth_call(&self, to: Address, data: &[u8]) -> Result<Vec<u8>> {
        let request: TypedTransaction = CallRequest::new().to(to).data(data.to_vec()).into();
        let result = self
            .provider
            .call(&request, Some(BlockId::Number(BlockNumber::Latest)))
            .await?;
        Ok(result.to_vec())
    }

    /// Chain id served by the node
    pub async fn chain_id(&self) -> Result<u64> {
        let chain_id = self.provider.get_chainid().await?;
        if chain_id > U256::from(u64::MAX) {
            return Err(ClientError::InvalidResponse(format!(
                "Chain id {} overflows u64",
                chain_id
            )));
        }
        Ok(chain_id.as_u64())
    }

    /// Fetch a receipt; `None` while the transaction is not mined
    pub async fn get_transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TransactionReceipt>> {
        debug!("Fetching receipt: {}", tx_hash);

        let hash = H256::from_str(tx_hash).map_err(|e| {
            ClientError::InvalidResponse(format!("Bad transaction hash {}: {}", tx_hash, e))
        })?;

        match self.provider.get_transaction_receipt(hash).await? {
            Some(receipt) => receipt_from_node(receipt).map(Some),
            None => Ok(None),
        }
    }

    /// Health check - verify the node answers and serves the expected chain
    pub async fn health_check(&self, expected_chain_id: u64) -> Result<bool> {
        match self.chain_id().await {
            Ok(chain_id) if chain_id == expected_chain_id => {
                info!("Node health check passed (chain {})", chain_id);
                Ok(true)
            }
            Ok(chain_id) => {
                error!(
                    "Node serves chain {} but {} is required",
                    chain_id, expected_chain_id
                );
                Ok(false)
            }
            Err(e) => {
                error!("Node health check failed: {:?}", e);
                Err(e)
            }
        }
    }
}

/// Reduce a node receipt to the fields the client acts on
fn receipt_from_node(receipt: NodeReceipt) -> Result<TransactionReceipt> {
    let status = match receipt.status.map(|status| status.as_u64()) {
        Some(1) => TransactionStatus::Success,
        Some(0) => TransactionStatus::Reverted,
        other => {
            return Err(ClientError::InvalidResponse(format!(
                "Unexpected receipt status: {:?}",
                other
            )))
        }
    };

    Ok(TransactionReceipt {
        transaction_hash: format!("{:?}", receipt.transaction_hash),
        status,
        block_number: receipt.block_number.map(|number| number.as_u64()),
    })
}
