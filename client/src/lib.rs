//! Vegan Rob's DAO governance client
//!
//! This library drives the voting workflow of the DAO front-end: it connects an
//! EIP-1193 wallet, derives the account's role from the governance and token
//! contracts, lists the proposals the account has not voted on yet and submits
//! votes and vote closures, waiting for their receipts.
//!
//! # Features
//!
//! - **Wallet Session**: Connect, disconnect and follow account/chain change events
//! - **Chain Assertion**: Switch the wallet to Harmony Mainnet, adding the network when unknown
//! - **Contract Reads**: `eth_call` against the governance and token contracts
//! - **Role Resolution**: OWNER > ADMIN > MEMBER > GUEST
//! - **Proposal Feed**: Bounded, cancellable, all-or-nothing fetch of open proposals
//! - **Image Normalization**: Rewrites broken IPFS gateway links
//! - **Vote Actions**: Vote and close-vote submission with receipt monitoring
//! - **View Models**: Header and voting table ready for any renderer
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use vrdao_client::{ClientConfig, GovernanceClient};
//! use ethers::types::Address;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     tracing_subscriber::fmt::init();
//!
//!     let dao: Address = "0x0000000000000000000000000000000000000da0".parse()?;
//!     let token: Address = "0x0000000000000000000000000000000000000707".parse()?;
//!     let config = ClientConfig::harmony_mainnet(dao, token)
//!         .with_wallet_url("http://127.0.0.1:1248");
//!
//!     let client = GovernanceClient::new(Arc::new(config))?;
//!     client.health_check().await?;
//!
//!     let account = client.connect().await?;
//!     println!("Connected {:?} as {}", account, client.session().role);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Examples
//!
//! ## Vote on a proposal
//!
//! ```rust,no_run
//! use vrdao_client::{ClientConfig, GovernanceClient};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GovernanceClient::new(Arc::new(ClientConfig::from_file("vrdao.toml")?))?;
//! client.connect().await?;
//!
//! let outcome = client.vote(3, true).await?;
//! for warning in &outcome.warnings {
//!     println!("warning: {}", warning);
//! }
//! println!("Vote confirmed: {}", outcome.tx_hash);
//! # Ok(())
//! # }
//! ```
//!
//! ## Render the voting page
//!
//! ```rust,no_run
//! use vrdao_client::{ClientConfig, GovernanceClient};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GovernanceClient::new(Arc::new(ClientConfig::from_file("vrdao.toml")?))?;
//! client.connect().await?;
//!
//! let page = client.vote_page().await;
//! println!("{}", page.heading);
//! for row in page.rows {
//!     println!("{}. {} ({})", row.number, row.name, row.image_url);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod abi;
pub mod actions;
pub mod config;
pub mod contract;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod monitor;
pub mod role;
pub mod rpc;
pub mod session;
pub mod types;
pub mod view;
pub mod wallet;

// Re-export commonly used types
pub use actions::{
    ActionKind, ActionOutcome, ActionState, ActionTracker, ActionWarning, Confirmations,
    VoteActions,
};
pub use config::{ChainDescriptor, ClientConfig, NativeCurrency, HARMONY_CHAIN_ID};
pub use contract::{ContractReader, RpcContractReader};
pub use error::{ClientError, Result};
pub use feed::{FeedSnapshot, ProposalFeed};
pub use gateway::{display_image, normalize_image_url, PLACEHOLDER_IMAGE};
pub use monitor::{MonitorOptions, MonitorResult, TransactionMonitor};
pub use role::resolve_role;
pub use rpc::NodeClient;
pub use session::{AccountObserver, SessionManager, SessionStore};
pub use types::{
    OpenProposal, Proposal, Role, RoleReading, Session, TransactionHash, TransactionReceipt,
    TransactionRequest, TransactionStatus,
};
pub use view::{HeaderView, ProposalRow, VotePage};
pub use wallet::{Eip1193Client, WalletEvent, WalletProvider};

use ethers::types::Address;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Main governance client that combines the wallet session, contract reads,
/// the proposal feed and the vote actions into a single interface.
///
/// This is the primary entry point for the DAO front-end.
#[derive(Clone)]
pub struct GovernanceClient {
    /// Node used for reads, receipts and health checks
    node: NodeClient,
    /// Wallet endpoint client, when one is configured
    wallet: Option<Eip1193Client>,
    /// Session controller
    session: SessionManager,
    /// Open proposal feed
    feed: ProposalFeed,
    /// Vote and close actions
    actions: VoteActions,
    /// Configuration
    config: Arc<ClientConfig>,
}

impl GovernanceClient {
    /// Create a new governance client
    ///
    /// # Arguments
    ///
    /// * `config` - Client configuration; without `wallet_url` the client can
    ///   read but every wallet operation fails with `WalletUnavailable`
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use vrdao_client::{ClientConfig, GovernanceClient};
    /// use ethers::types::Address;
    /// use std::sync::Arc;
    ///
    /// let config = ClientConfig::harmony_mainnet(Address::repeat_byte(1), Address::repeat_byte(2));
    /// let client = GovernanceClient::new(Arc::new(config)).unwrap();
    /// ```
    pub fn new(config: Arc<ClientConfig>) -> Result<Self> {
        config.validate()?;

        let node = NodeClient::new(&config)?;
        let reader = Arc::new(RpcContractReader::with_node(
            node.clone(),
            config.dao_address,
            config.token_address,
        ));

        let wallet = match config.wallet_url {
            Some(_) => Some(Eip1193Client::new(&config)?),
            None => {
                warn!("No wallet provider configured");
                None
            }
        };
        let provider = wallet
            .clone()
            .map(|wallet| Arc::new(wallet) as Arc<dyn WalletProvider>);

        Self::assemble(config, node, wallet, provider, reader)
    }

    /// Create a client over caller-supplied wallet and contract reader
    pub fn with_providers(
        config: Arc<ClientConfig>,
        wallet: Option<Arc<dyn WalletProvider>>,
        reader: Arc<dyn ContractReader>,
    ) -> Result<Self> {
        config.validate()?;
        let node = NodeClient::new(&config)?;
        Self::assemble(config, node, None, wallet, reader)
    }

    fn assemble(
        config: Arc<ClientConfig>,
        node: NodeClient,
        wallet: Option<Eip1193Client>,
        provider: Option<Arc<dyn WalletProvider>>,
        reader: Arc<dyn ContractReader>,
    ) -> Result<Self> {
        info!(
            "Initializing governance client for {} (chain {})",
            config.chain.chain_name, config.chain.chain_id
        );

        let feed = ProposalFeed::new(reader.clone(), config.max_proposals);
        let session = SessionManager::new(
            provider,
            reader.clone(),
            SessionStore::new(),
            config.chain.clone(),
        )
        .with_account_observer(Arc::new(feed.clone()));
        let monitor =
            TransactionMonitor::with_node(node.clone(), MonitorOptions::from_config(&config));
        let actions = VoteActions::new(
            session.clone(),
            reader,
            feed.clone(),
            Arc::new(monitor),
            config.dao_address,
            config.strict_authorization,
        );

        Ok(Self {
            node,
            wallet,
            session,
            feed,
            actions,
            config,
        })
    }

    /// Wallet endpoint client; the host forwards wallet events through
    /// [`Eip1193Client::emit`]
    pub fn wallet(&self) -> Option<&Eip1193Client> {
        self.wallet.as_ref()
    }

    /// Get the session controller
    pub fn session_manager(&self) -> &SessionManager {
        &self.session
    }

    /// Get the proposal feed
    pub fn feed(&self) -> &ProposalFeed {
        &self.feed
    }

    /// Get the vote actions
    pub fn actions(&self) -> &VoteActions {
        &self.actions
    }

    /// Connect the wallet, then load the proposal feed for the account.
    ///
    /// A failed feed load is logged and does not undo the connection.
    pub async fn connect(&self) -> Result<Address> {
        let account = self.session.connect().await?;

        if let Err(e) = self.feed.refresh(account).await {
            warn!("Failed to load proposals after connect: {}", e);
        }

        Ok(account)
    }

    /// Clear the session and the feed, then revoke the wallet permission
    pub async fn disconnect(&self) {
        self.session.disconnect().await;
        self.feed.clear().await;
    }

    /// Copy of the current session
    pub fn session(&self) -> Session {
        self.session.session()
    }

    /// Watch session changes
    pub fn subscribe_session(&self) -> watch::Receiver<Session> {
        self.session.store().subscribe()
    }

    /// Refetch the open proposals for the connected account
    pub async fn refresh_proposals(&self) -> Result<FeedSnapshot> {
        let account = self.session().account.ok_or(ClientError::NotConnected)?;
        self.feed.refresh(account).await
    }

    /// Open proposals from the last published feed
    pub async fn open_proposals(&self) -> Vec<OpenProposal> {
        self.feed
            .current()
            .await
            .map(|snapshot| snapshot.proposals)
            .unwrap_or_default()
    }

    /// Vote on a proposal
    pub async fn vote(&self, proposal_id: u64, support: bool) -> Result<ActionOutcome> {
        self.actions.vote(proposal_id, support).await
    }

    /// Close voting on a proposal
    pub async fn close_vote(&self, proposal_id: u64) -> Result<ActionOutcome> {
        self.actions.close_vote(proposal_id).await
    }

    /// Current action state
    pub fn action_state(&self) -> ActionState {
        self.actions.tracker().state()
    }

    /// Header view model
    pub fn header_view(&self) -> HeaderView {
        HeaderView::from_session(&self.session())
    }

    /// Voting page view model built from the last published feed
    pub async fn vote_page(&self) -> VotePage {
        let session = self.session();
        match self.feed.current().await {
            Some(snapshot) if session.account == Some(snapshot.account) => {
                let reading = RoleReading {
                    owner: snapshot.owner,
                    admin: snapshot.admin,
                    ..Default::default()
                };
                VotePage::build(&snapshot.proposals, &session, &reading)
            }
            _ => VotePage::build(&[], &session, &RoleReading::default()),
        }
    }

    /// Health check - verify the node answers and serves the configured chain
    pub async fn health_check(&self) -> Result<bool> {
        self.node.health_check(self.config.chain.chain_id).await
    }

    /// Get configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}
