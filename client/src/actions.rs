//! Vote and close-vote actions.
//!
//! Each action walks `Idle → ChainAssert → Submitted → Confirmed | Failed → Idle`.
//! Role checks only warn by default: the governance contract is the final
//! authority. A zero token balance is the one local check that always blocks a
//! vote. With `strict_authorization` every failed check blocks before any
//! transaction is attempted.

use crate::abi;
use crate::contract::ContractReader;
use crate::error::{ClientError, Result};
use crate::feed::{FeedSnapshot, ProposalFeed};
use crate::monitor::TransactionMonitor;
use crate::session::SessionManager;
use crate::types::{Role, TransactionHash, TransactionReceipt, TransactionRequest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ethers::types::Address;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Waits for a submitted transaction to be mined
#[async_trait]
pub trait Confirmations: Send + Sync {
    /// Resolve once the transaction succeeded; reverts and timeouts are errors
    async fn wait_for_confirmation(&self, tx_hash: &str) -> Result<TransactionReceipt>;
}

#[async_trait]
impl Confirmations for TransactionMonitor {
    async fn wait_for_confirmation(&self, tx_hash: &str) -> Result<TransactionReceipt> {
        TransactionMonitor::wait_for_confirmation(self, tx_hash).await
    }
}

/// Step of the action state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionState {
    /// Nothing in flight
    #[default]
    Idle,
    /// Making sure the wallet is on the required chain
    ChainAssert,
    /// Transaction handed to the wallet, waiting for the receipt
    Submitted,
    /// Receipt arrived with success status
    Confirmed,
    /// Action aborted or transaction failed
    Failed,
}

/// Observable action state plus the transitions of the latest action
#[derive(Clone)]
pub struct ActionTracker {
    state: Arc<watch::Sender<ActionState>>,
    transitions: Arc<Mutex<Vec<ActionState>>>,
}

impl ActionTracker {
    /// Create an idle tracker
    pub fn new() -> Self {
        let (state, _) = watch::channel(ActionState::Idle);
        Self {
            state: Arc::new(state),
            transitions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Current state
    pub fn state(&self) -> ActionState {
        *self.state.borrow()
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<ActionState> {
        self.state.subscribe()
    }

    /// States the latest action went through, starting from `Idle`
    pub fn last_transitions(&self) -> Vec<ActionState> {
        self.lock().clone()
    }

    fn begin(&self) {
        *self.lock() = vec![ActionState::Idle];
        self.set(ActionState::ChainAssert);
    }

    fn set(&self, state: ActionState) {
        self.lock().push(state);
        self.state.send_replace(state);
    }

    fn finish(&self, state: ActionState) {
        self.set(state);
        self.set(ActionState::Idle);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ActionState>> {
        self.transitions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ActionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-blocking authorization warning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionWarning {
    /// Vote attempted while the session role is GUEST
    NotAMember,
    /// Close attempted by an account that is neither owner nor admin
    NoPermission,
}

impl fmt::Display for ActionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionWarning::NotAMember => write!(f, "You are not a Member!"),
            ActionWarning::NoPermission => write!(f, "you dont have a permission"),
        }
    }
}

/// What was submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// `vote(proposal_id, support)`
    Vote {
        /// Proposal voted on
        proposal_id: u64,
        /// Yes or no
        support: bool,
    },
    /// `stopVoting(proposal_id)`
    CloseVote {
        /// Proposal closed
        proposal_id: u64,
    },
}

/// Result of a confirmed action
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    /// What was submitted
    pub kind: ActionKind,
    /// Transaction hash
    pub tx_hash: TransactionHash,
    /// Successful receipt
    pub receipt: TransactionReceipt,
    /// Warnings raised by the local checks
    pub warnings: Vec<ActionWarning>,
    /// When confirmation was observed
    pub confirmed_at: DateTime<Utc>,
    /// Feed fetched after confirmation, `None` if that fetch failed
    pub feed: Option<FeedSnapshot>,
}

impl ActionOutcome {
    /// Message to show once the action is confirmed
    pub fn notice(&self) -> Option<&'static str> {
        match self.kind {
            ActionKind::CloseVote { .. } => Some("Successfully Closed"),
            ActionKind::Vote { .. } => None,
        }
    }
}

/// Submits votes and vote closures from the connected account
#[derive(Clone)]
pub struct VoteActions {
    session: SessionManager,
    reader: Arc<dyn ContractReader>,
    feed: ProposalFeed,
    confirmations: Arc<dyn Confirmations>,
    dao_address: Address,
    strict_authorization: bool,
    tracker: ActionTracker,
}

impl VoteActions {
    /// Create the action runner
    pub fn new(
        session: SessionManager,
        reader: Arc<dyn ContractReader>,
        feed: ProposalFeed,
        confirmations: Arc<dyn Confirmations>,
        dao_address: Address,
        strict_authorization: bool,
    ) -> Self {
        Self {
            session,
            reader,
            feed,
            confirmations,
            dao_address,
            strict_authorization,
            tracker: ActionTracker::new(),
        }
    }

    /// Action state tracker
    pub fn tracker(&self) -> &ActionTracker {
        &self.tracker
    }

    /// Vote yes (`support = true`) or no on a proposal
    pub async fn vote(&self, proposal_id: u64, support: bool) -> Result<ActionOutcome> {
        let _sequence = self.session.sequence().await;
        let session = self.session.session();
        let account = session.account.ok_or(ClientError::NotConnected)?;

        let mut warnings = Vec::new();
        if session.role == Role::Guest {
            warn!("{}", ActionWarning::NotAMember);
            if self.strict_authorization {
                return Err(ClientError::NotMember);
            }
            warnings.push(ActionWarning::NotAMember);
        }

        let balance = self.reader.balance_of(account).await?;
        if balance.is_zero() {
            warn!("{:?} holds no governance tokens, vote not submitted", account);
            return Err(ClientError::NotMember);
        }

        info!(
            "Voting {} on proposal {} from {:?}",
            if support { "yes" } else { "no" },
            proposal_id,
            account
        );
        self.submit(
            account,
            ActionKind::Vote {
                proposal_id,
                support,
            },
            abi::vote_call(proposal_id, support),
            warnings,
        )
        .await
    }

    /// Close voting on a proposal
    pub async fn close_vote(&self, proposal_id: u64) -> Result<ActionOutcome> {
        let _sequence = self.session.sequence().await;
        let account = self
            .session
            .session()
            .account
            .ok_or(ClientError::NotConnected)?;

        let mut warnings = Vec::new();
        if !self.is_owner_or_admin(account).await? {
            warn!("{}", ActionWarning::NoPermission);
            if self.strict_authorization {
                return Err(ClientError::Unauthorized);
            }
            warnings.push(ActionWarning::NoPermission);
        }

        info!("Closing voting on proposal {} from {:?}", proposal_id, account);
        self.submit(
            account,
            ActionKind::CloseVote { proposal_id },
            abi::stop_voting_call(proposal_id),
            warnings,
        )
        .await
    }

    /// Compare against the owner/admin cached with the feed, reading them when
    /// no snapshot for this account exists yet
    async fn is_owner_or_admin(&self, account: Address) -> Result<bool> {
        if let Some(snapshot) = self.feed.current().await {
            if snapshot.account == account {
                return Ok(account == snapshot.owner || account == snapshot.admin);
            }
        }

        let (owner, admin) = futures::try_join!(self.reader.owner(), self.reader.admin())?;
        Ok(account == owner || account == admin)
    }

    async fn submit(
        &self,
        account: Address,
        kind: ActionKind,
        data: Vec<u8>,
        warnings: Vec<ActionWarning>,
    ) -> Result<ActionOutcome> {
        self.tracker.begin();

        let (tx_hash, receipt) = match self.send_and_confirm(account, data).await {
            Ok(confirmed) => {
                self.tracker.finish(ActionState::Confirmed);
                confirmed
            }
            Err(e) => {
                error!("{:?} failed: {}", kind, e);
                self.tracker.finish(ActionState::Failed);
                return Err(e);
            }
        };

        let feed = match self.feed.refresh(account).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Feed refresh after confirmation failed: {}", e);
                None
            }
        };

        Ok(ActionOutcome {
            kind,
            tx_hash,
            receipt,
            warnings,
            confirmed_at: Utc::now(),
            feed,
        })
    }

    async fn send_and_confirm(
        &self,
        account: Address,
        data: Vec<u8>,
    ) -> Result<(TransactionHash, TransactionReceipt)> {
        self.session.ensure_chain().await?;

        let request = TransactionRequest {
            from: account,
            to: self.dao_address,
            data: format!("0x{}", hex::encode(data)),
        };
        let tx_hash = self
            .session
            .wallet()?
            .send_transaction(&request)
            .await
            .map_err(|e| match e {
                ClientError::UserRejected | ClientError::WalletUnavailable => e,
                other => ClientError::TransactionFailed(other.to_string()),
            })?;
        self.tracker.set(ActionState::Submitted);
        info!("Transaction submitted: {}", tx_hash);

        let receipt = self.confirmations.wait_for_confirmation(&tx_hash).await?;
        Ok((tx_hash, receipt))
    }
}
