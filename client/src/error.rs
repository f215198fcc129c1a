//! Error types for the governance client.
//!
//! This module defines every failure the wallet session, contract reads and
//! voting actions can produce, from a missing wallet provider to a reverted
//! transaction.

use thiserror::Error;

/// EIP-1193 error code: the user rejected the request
pub const USER_REJECTED_CODE: i64 = 4001;

/// EIP-3085 error code: the requested chain has not been added to the wallet
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

/// Main error type for governance client operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// No wallet provider is available
    #[error("No wallet provider found. Please install a wallet to connect.")]
    WalletUnavailable,

    /// The user declined a wallet request
    #[error("Request rejected by the user")]
    UserRejected,

    /// The wallet could not be moved to the required chain
    #[error("Failed to switch network: {0}")]
    ChainSwitchFailed(String),

    /// The wallet returned no accounts
    #[error("No accounts found. Please connect your wallet.")]
    NoAccounts,

    /// An action needs a connected session
    #[error("Wallet is not connected")]
    NotConnected,

    /// The account holds no governance tokens
    #[error("you are not a member of Vegan Rob's DAO")]
    NotMember,

    /// The account is neither owner nor admin
    #[error("you dont have a permission")]
    Unauthorized,

    /// A contract read failed
    #[error("Contract read failed: {0}")]
    ReadFailed(String),

    /// A transaction was submitted but did not succeed
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// No receipt arrived in time
    #[error("Transaction timeout after {0} seconds")]
    TransactionTimeout(u64),

    /// A newer proposal fetch superseded this one
    #[error("Proposal fetch superseded by a newer fetch")]
    FetchCancelled,

    /// JSON-RPC error object returned by the node or the wallet
    #[error("RPC error {code}: {message}")]
    RpcError {
        /// Error code
        code: i64,
        /// Error message
        message: String,
    },

    /// Node provider error (transport, JSON-RPC error object or bad payload)
    #[error("Node provider error: {0}")]
    ProviderError(#[from] ethers::providers::ProviderError),

    /// Network communication error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// URL parse error
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),
}

/// Result type alias for governance client operations
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Whether a UI should surface this error as an alert.
    ///
    /// Read failures and superseded fetches are only logged: the previously
    /// displayed data stays on screen until the next successful fetch.
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            ClientError::ReadFailed(_) | ClientError::FetchCancelled
        )
    }

    /// Map a JSON-RPC error object coming from a wallet provider.
    pub fn from_provider(code: i64, message: String) -> Self {
        match code {
            USER_REJECTED_CODE => ClientError::UserRejected,
            _ => ClientError::RpcError { code, message },
        }
    }

    /// Whether the wallet reported the requested chain as unknown.
    pub fn is_unrecognized_chain(&self) -> bool {
        matches!(
            self,
            ClientError::RpcError {
                code: UNRECOGNIZED_CHAIN_CODE,
                ..
            }
        )
    }

    /// Collapse any error raised while reading contract state into `ReadFailed`.
    pub fn into_read_failed(self) -> Self {
        match self {
            ClientError::ReadFailed(_) | ClientError::FetchCancelled => self,
            other => ClientError::ReadFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_error_display() {
        let err = ClientError::ReadFailed("owner()".to_string());
        assert_eq!(err.to_string(), "Contract read failed: owner()");
        assert_eq!(
            ClientError::NotMember.to_string(),
            "you are not a member of Vegan Rob's DAO"
        );
    }

    #[test]
    fn test_provider_error_mapping() {
        assert_matches!(
            ClientError::from_provider(4001, "User denied".to_string()),
            ClientError::UserRejected
        );

        let unknown_chain = ClientError::from_provider(4902, "Unrecognized chain".to_string());
        assert!(unknown_chain.is_unrecognized_chain());

        let other = ClientError::from_provider(-32603, "Internal error".to_string());
        assert!(!other.is_unrecognized_chain());
        assert!(other.to_string().contains("-32603"));
    }

    #[test]
    fn test_read_failed_collapse() {
        let err = ClientError::InvalidResponse("bad hex".to_string()).into_read_failed();
        assert_matches!(err, ClientError::ReadFailed(msg) if msg.contains("bad hex"));

        assert_matches!(
            ClientError::FetchCancelled.into_read_failed(),
            ClientError::FetchCancelled
        );
    }

    #[test]
    fn test_user_facing() {
        assert!(ClientError::WalletUnavailable.is_user_facing());
        assert!(ClientError::TransactionFailed("reverted".to_string()).is_user_facing());
        assert!(!ClientError::ReadFailed("x".to_string()).is_user_facing());
        assert!(!ClientError::FetchCancelled.is_user_facing());
    }
}
