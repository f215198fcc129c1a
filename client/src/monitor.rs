//! Transaction confirmation monitoring.
//!
//! After the wallet hands back a transaction hash, the monitor polls
//! `eth_getTransactionReceipt` with a growing interval until the receipt shows
//! up or the configured timeout elapses.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::rpc::NodeClient;
use crate::types::{TransactionReceipt, TransactionStatus};
use backoff::{backoff::Backoff, ExponentialBackoff, ExponentialBackoffBuilder};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Monitoring options
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// First poll interval (in milliseconds)
    pub poll_interval_ms: u64,
    /// Largest poll interval (in milliseconds)
    pub max_poll_interval_ms: u64,
    /// Timeout (in seconds)
    pub timeout_secs: u64,
}

impl MonitorOptions {
    /// Create from client config
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            poll_interval_ms: config.tx_poll_interval_ms,
            max_poll_interval_ms: config.tx_max_poll_interval_ms,
            timeout_secs: config.tx_timeout_secs,
        }
    }

    /// Set custom poll interval
    pub fn with_poll_interval(mut self, interval_ms: u64) -> Self {
        self.poll_interval_ms = interval_ms;
        self.max_poll_interval_ms = self.max_poll_interval_ms.max(interval_ms);
        self
    }

    /// Set custom timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.poll_interval_ms))
            .with_max_interval(Duration::from_millis(self.max_poll_interval_ms))
            .with_randomization_factor(0.0)
            .with_multiplier(2.0)
            .with_max_elapsed_time(Some(Duration::from_secs(self.timeout_secs)))
            .build()
    }
}

/// Transaction monitoring result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorResult {
    /// Mined with status 0x1
    Confirmed(TransactionReceipt),
    /// Mined with status 0x0
    Reverted(TransactionReceipt),
    /// No receipt before the timeout
    Timeout,
}

/// Transaction monitor for tracking receipts
#[derive(Clone)]
pub struct TransactionMonitor {
    node: NodeClient,
    options: MonitorOptions,
}

impl TransactionMonitor {
    /// Create a new transaction monitor
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self::with_node(
            NodeClient::new(config)?,
            MonitorOptions::from_config(config),
        ))
    }

    /// Create a monitor over an existing node client
    pub fn with_node(node: NodeClient, options: MonitorOptions) -> Self {
        Self { node, options }
    }

    /// Poll until the transaction is mined or the timeout elapses
    pub async fn monitor(&self, tx_hash: &str, options: &MonitorOptions) -> Result<MonitorResult> {
        info!(
            "Monitoring transaction: {} (timeout: {}s)",
            tx_hash, options.timeout_secs
        );

        let mut backoff = options.backoff();

        loop {
            match self.node.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => match receipt.status {
                    TransactionStatus::Success => {
                        info!("Transaction confirmed: {}", tx_hash);
                        return Ok(MonitorResult::Confirmed(receipt));
                    }
                    TransactionStatus::Reverted => {
                        warn!("Transaction reverted: {}", tx_hash);
                        return Ok(MonitorResult::Reverted(receipt));
                    }
                },
                Ok(None) => {
                    debug!("Transaction not yet mined: {}", tx_hash);
                }
                Err(e) => {
                    debug!("Error fetching receipt for {}: {:?}", tx_hash, e);
                }
            }

            match backoff.next_backoff() {
                Some(delay) => sleep(delay).await,
                None => {
                    warn!("Transaction monitoring timed out: {}", tx_hash);
                    return Ok(MonitorResult::Timeout);
                }
            }
        }
    }

    /// Wait for a successful receipt with the configured options.
    ///
    /// A revert becomes `TransactionFailed`, a missing receipt
    /// `TransactionTimeout`.
    pub async fn wait_for_confirmation(&self, tx_hash: &str) -> Result<TransactionReceipt> {
        match self.monitor(tx_hash, &self.options).await? {
            MonitorResult::Confirmed(receipt) => Ok(receipt),
            MonitorResult::Reverted(receipt) => Err(ClientError::TransactionFailed(format!(
                "{} reverted in block {:?}",
                receipt.transaction_hash, receipt.block_number
            ))),
            MonitorResult::Timeout => Err(ClientError::TransactionTimeout(self.options.timeout_secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::Address;

    fn config() -> ClientConfig {
        ClientConfig::harmony_mainnet(
            Address::from_low_u64_be(0xda0),
            Address::from_low_u64_be(0x707),
        )
    }

    #[test]
    fn test_transaction_monitor_creation() {
        assert!(TransactionMonitor::new(&config()).is_ok());
    }

    #[test]
    fn test_monitor_options_from_config() {
        let config = config();
        let options = MonitorOptions::from_config(&config);
        assert_eq!(options.poll_interval_ms, config.tx_poll_interval_ms);
        assert_eq!(options.max_poll_interval_ms, config.tx_max_poll_interval_ms);
        assert_eq!(options.timeout_secs, config.tx_timeout_secs);
    }

    #[test]
    fn test_monitor_options_builder() {
        let options = MonitorOptions::from_config(&config())
            .with_poll_interval(20_000)
            .with_timeout(30);

        assert_eq!(options.poll_interval_ms, 20_000);
        assert_eq!(options.max_poll_interval_ms, 20_000);
        assert_eq!(options.timeout_secs, 30);
    }

    #[test]
    fn test_backoff_grows_to_max() {
        let options = MonitorOptions {
            poll_interval_ms: 100,
            max_poll_interval_ms: 350,
            timeout_secs: 60,
        };
        let mut backoff = options.backoff();

        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(200)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(350)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(350)));
    }
}
