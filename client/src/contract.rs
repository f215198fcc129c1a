//! Read-only access to the governance and token contracts.
//!
//! Every method is a single `eth_call`. Any failure, whether transport,
//! JSON-RPC error or an undecodable result, is reported as
//! [`ClientError::ReadFailed`] so the enclosing fetch aborts as a whole.

use crate::abi;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::rpc::NodeClient;
use crate::types::{Proposal, RoleReading};
use async_trait::async_trait;
use ethers::abi::Token;
use ethers::types::{Address, U256};
use tracing::debug;

/// Read surface of the governance and token contracts
#[async_trait]
pub trait ContractReader: Send + Sync {
    /// `owner()` of the governance contract
    async fn owner(&self) -> Result<Address>;

    /// `admin()` of the governance contract
    async fn admin(&self) -> Result<Address>;

    /// Governance token balance of `account`
    async fn balance_of(&self, account: Address) -> Result<U256>;

    /// `proposalIndex()`: number of proposals ever created
    async fn proposal_count(&self) -> Result<u64>;

    /// `proposals(index)`
    async fn proposal(&self, index: u64) -> Result<Proposal>;

    /// `votesHistory(account, proposal_id)`
    async fn has_voted(&self, account: Address, proposal_id: u64) -> Result<bool>;

    /// Balance, owner and admin for `account`, read as three independent calls
    async fn read_role(&self, account: Address) -> Result<RoleReading> {
        let (balance, owner, admin) =
            futures::try_join!(self.balance_of(account), self.owner(), self.admin())?;

        Ok(RoleReading {
            owner,
            admin,
            balance,
        })
    }
}

/// [`ContractReader`] backed by `eth_call` against the configured node
#[derive(Clone)]
pub struct RpcContractReader {
    node: NodeClient,
    dao_address: Address,
    token_address: Address,
}

impl RpcContractReader {
    /// Create a reader for the configured contracts
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self::with_node(
            NodeClient::new(config)?,
            config.dao_address,
            config.token_address,
        ))
    }

    /// Create a reader over an existing node client
    pub fn with_node(node: NodeClient, dao_address: Address, token_address: Address) -> Self {
        Self {
            node,
            dao_address,
            token_address,
        }
    }

    async fn call(&self, to: Address, signature: &str, args: &[Token]) -> Result<Vec<u8>> {
        debug!("eth_call {} on {:?}", signature, to);
        self.node
            .eth_call(to, &abi::encode_call(signature, args))
            .await
            .map_err(|e| ClientError::ReadFailed(format!("{}: {}", signature, e)))
    }
}

#[async_trait]
impl ContractReader for RpcContractReader {
    async fn owner(&self) -> Result<Address> {
        let data = self.call(self.dao_address, abi::OWNER, &[]).await?;
        abi::decode_address(abi::OWNER, &data).map_err(ClientError::into_read_failed)
    }

    async fn admin(&self) -> Result<Address> {
        let data = self.call(self.dao_address, abi::ADMIN, &[]).await?;
        abi::decode_address(abi::ADMIN, &data).map_err(ClientError::into_read_failed)
    }

    async fn balance_of(&self, account: Address) -> Result<U256> {
        let data = self
            .call(
                self.token_address,
                abi::BALANCE_OF,
                &[Token::Address(account)],
            )
            .await?;
        abi::decode_uint(abi::BALANCE_OF, &data).map_err(ClientError::into_read_failed)
    }

    async fn proposal_count(&self) -> Result<u64> {
        let data = self.call(self.dao_address, abi::PROPOSAL_INDEX, &[]).await?;
        abi::decode_uint(abi::PROPOSAL_INDEX, &data)
            .and_then(|count| abi::uint_to_u64(abi::PROPOSAL_INDEX, count))
            .map_err(ClientError::into_read_failed)
    }

    async fn proposal(&self, index: u64) -> Result<Proposal> {
        let data = self
            .call(
                self.dao_address,
                abi::PROPOSALS,
                &[Token::Uint(U256::from(index))],
            )
            .await?;
        abi::decode_proposal(&data).map_err(ClientError::into_read_failed)
    }

    async fn has_voted(&self, account: Address, proposal_id: u64) -> Result<bool> {
        let data = self
            .call(
                self.dao_address,
                abi::VOTES_HISTORY,
                &[Token::Address(account), Token::Uint(U256::from(proposal_id))],
            )
            .await?;
        abi::decode_bool(abi::VOTES_HISTORY, &data).map_err(ClientError::into_read_failed)
    }
}


#[cfg(test)]
mod tests {
    use super::fake::{FakeReader, FakeState};
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_reader_creation() {
        let config = ClientConfig::harmony_mainnet(
            Address::from_low_u64_be(0xda0),
            Address::from_low_u64_be(0x707),
        );
        assert!(RpcContractReader::new(&config).is_ok());
    }

    #[tokio::test]
    async fn test_read_role_combines_reads() {
        let account = Address::from_low_u64_be(9);
        let mut state = FakeState {
            owner: Address::from_low_u64_be(1),
            admin: Address::from_low_u64_be(2),
            ..Default::default()
        };
        state.balances.insert(account, U256::from(5));
        let reader = FakeReader::new(state);

        let reading = reader.read_role(account).await.unwrap();
        assert_eq!(reading.owner, Address::from_low_u64_be(1));
        assert_eq!(reading.admin, Address::from_low_u64_be(2));
        assert_eq!(reading.balance, U256::from(5));
    }

    #[tokio::test]
    async fn test_read_role_fails_when_any_read_fails() {
        let reader = FakeReader::new(FakeState {
            fail_owner: true,
            ..Default::default()
        });

        let result = reader.read_role(Address::from_low_u64_be(9)).await;
        assert_matches!(result, Err(ClientError::ReadFailed(_)));
    }
}
