//! Proposal feed: the open proposals the connected account can still vote on.
//!
//! A fetch reads `proposalIndex()` once and walks the indices in order,
//! keeping proposals whose `votesHistory` entry for the account is false.
//! Fetches are all-or-nothing: a failed read aborts the walk and the last
//! published snapshot stays in place. Each refresh takes a new generation
//! number and an older walk stops as soon as a newer one has started.

use crate::contract::ContractReader;
use crate::error::{ClientError, Result};
use crate::gateway::normalize_image_url;
use crate::session::AccountObserver;
use crate::types::OpenProposal;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ethers::types::Address;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Published result of a successful refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSnapshot {
    /// Account the feed was fetched for
    pub account: Address,
    /// Proposals the account has not voted on, in index order
    pub proposals: Vec<OpenProposal>,
    /// Governance contract owner at fetch time
    pub owner: Address,
    /// Governance contract admin at fetch time
    pub admin: Address,
    /// When the fetch completed
    pub fetched_at: DateTime<Utc>,
}

/// Bounded, cancellable proposal feed
#[derive(Clone)]
pub struct ProposalFeed {
    reader: Arc<dyn ContractReader>,
    max_proposals: u64,
    generation: Arc<AtomicU64>,
    current: Arc<RwLock<Option<FeedSnapshot>>>,
}

impl ProposalFeed {
    /// Create a feed scanning at most `max_proposals` indices per fetch
    pub fn new(reader: Arc<dyn ContractReader>, max_proposals: u64) -> Self {
        Self {
            reader,
            max_proposals,
            generation: Arc::new(AtomicU64::new(0)),
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Fetch the open proposals for `account` without publishing them
    pub async fn list_open_proposals(&self, account: Address) -> Result<Vec<OpenProposal>> {
        self.walk(account, None).await
    }

    /// Fetch and publish a new snapshot for `account`.
    ///
    /// Returns `FetchCancelled` when a newer refresh started meanwhile; in
    /// that case, and on any read failure, the published snapshot is left
    /// untouched.
    pub async fn refresh(&self, account: Address) -> Result<FeedSnapshot> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Refreshing proposal feed (generation {})", generation);

        let (owner, admin) = futures::try_join!(self.reader.owner(), self.reader.admin())?;
        let proposals = self.walk(account, Some(generation)).await?;

        let mut current = self.current.write().await;
        if self.is_superseded(generation) {
            return Err(ClientError::FetchCancelled);
        }

        let snapshot = FeedSnapshot {
            account,
            proposals,
            owner,
            admin,
            fetched_at: Utc::now(),
        };
        *current = Some(snapshot.clone());

        info!(
            "Proposal feed updated: {} open proposals for {:?}",
            snapshot.proposals.len(),
            account
        );
        Ok(snapshot)
    }

    /// Last published snapshot
    pub async fn current(&self) -> Option<FeedSnapshot> {
        self.current.read().await.clone()
    }

    /// Drop the published snapshot and cancel any running refresh
    pub async fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.current.write().await = None;
    }

    fn is_superseded(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    fn check(&self, generation: Option<u64>) -> Result<()> {
        match generation {
            Some(generation) if self.is_superseded(generation) => {
                debug!("Proposal fetch generation {} superseded", generation);
                Err(ClientError::FetchCancelled)
            }
            _ => Ok(()),
        }
    }

    async fn walk(&self, account: Address, generation: Option<u64>) -> Result<Vec<OpenProposal>> {
        let count = self.reader.proposal_count().await?;
        let start = count.saturating_sub(self.max_proposals);
        if start > 0 {
            warn!(
                "{} proposals on chain, scanning only the latest {}",
                count, self.max_proposals
            );
        }

        let mut open = Vec::new();
        for index in start..count {
            self.check(generation)?;
            let proposal = self.reader.proposal(index).await?;

            self.check(generation)?;
            if self.reader.has_voted(account, proposal.id).await? {
                continue;
            }

            let processed_image_url = normalize_image_url(&proposal.source);
            open.push(OpenProposal {
                proposal,
                processed_image_url,
            });
        }

        Ok(open)
    }
}

/// Follows wallet account switches: refetch for the new account, or drop the
/// snapshot when the wallet has no account left.
#[async_trait]
impl AccountObserver for ProposalFeed {
    async fn account_changed(&self, account: Option<Address>) {
        match account {
            Some(account) => {
                if let Err(e) = self.refresh(account).await {
                    warn!("Failed to reload proposals for {:?}: {}", account, e);
                }
            }
            None => self.clear().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::fake::{FakeReader, FakeState};
    use crate::types::Proposal;
    use assert_matches::assert_matches;

    fn account() -> Address {
        Address::from_low_u64_be(5)
    }

    fn proposal(id: u64, source: &str) -> Proposal {
        Proposal {
            id,
            name: format!("Election {}", id),
            source: source.to_string(),
        }
    }

    fn reader_with(proposals: Vec<Proposal>) -> Arc<FakeReader> {
        Arc::new(FakeReader::new(FakeState {
            owner: Address::from_low_u64_be(1),
            admin: Address::from_low_u64_be(2),
            proposals,
            ..Default::default()
        }))
    }

    #[tokio::test]
    async fn test_excludes_voted_proposals() {
        let reader = reader_with(vec![
            proposal(0, "Qm0"),
            proposal(1, "https://vrdao.mypinata.cloud/ipfs/Qm1"),
            proposal(2, ""),
        ]);
        reader.state.lock().unwrap().votes.insert((account(), 0));
        let feed = ProposalFeed::new(reader, 256);

        let open = feed.list_open_proposals(account()).await.unwrap();
        let ids: Vec<u64> = open.iter().map(|p| p.proposal.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(
            open[0].processed_image_url.as_deref(),
            Some("https://gateway.pinata.cloud/ipfs/Qm1")
        );
        assert_eq!(open[1].processed_image_url, None);
    }

    #[tokio::test]
    async fn test_votes_are_per_account() {
        let reader = reader_with(vec![proposal(0, "Qm0")]);
        let other = Address::from_low_u64_be(77);
        reader.state.lock().unwrap().votes.insert((other, 0));
        let feed = ProposalFeed::new(reader, 256);

        assert_eq!(feed.list_open_proposals(account()).await.unwrap().len(), 1);
        assert!(feed.list_open_proposals(other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_vote_status_uses_proposal_id() {
        // Index 0 holds proposal id 10
        let reader = reader_with(vec![proposal(10, "Qm10")]);
        reader.state.lock().unwrap().votes.insert((account(), 10));
        let feed = ProposalFeed::new(reader, 256);

        assert!(feed.list_open_proposals(account()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_failure_keeps_previous_snapshot() {
        let reader = reader_with(vec![proposal(0, "Qm0"), proposal(1, "Qm1")]);
        let feed = ProposalFeed::new(reader.clone(), 256);

        let first = feed.refresh(account()).await.unwrap();
        assert_eq!(first.proposals.len(), 2);

        {
            let mut state = reader.state.lock().unwrap();
            state.proposals.push(proposal(2, "Qm2"));
            state.failing_index = Some(1);
        }

        let result = feed.refresh(account()).await;
        assert_matches!(result, Err(ClientError::ReadFailed(_)));
        assert_eq!(feed.current().await, Some(first));
    }

    #[tokio::test]
    async fn test_read_failure_on_first_load_publishes_nothing() {
        let reader = reader_with(vec![proposal(0, "Qm0"), proposal(1, "Qm1")]);
        reader.state.lock().unwrap().failing_index = Some(1);
        let feed = ProposalFeed::new(reader, 256);

        assert!(feed.refresh(account()).await.is_err());
        assert_eq!(feed.current().await, None);
    }

    #[tokio::test]
    async fn test_scan_is_bounded_to_latest_indices() {
        let proposals = (0..10).map(|id| proposal(id, "Qm")).collect();
        let reader = reader_with(proposals);
        let feed = ProposalFeed::new(reader.clone(), 3);

        let open = feed.list_open_proposals(account()).await.unwrap();
        let ids: Vec<u64> = open.iter().map(|p| p.proposal.id).collect();
        assert_eq!(ids, vec![7, 8, 9]);
        assert_eq!(reader.proposal_reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_concurrent_refresh_publishes_latest() {
        let reader = reader_with(vec![proposal(0, "Qm0"), proposal(1, "Qm1")]);
        reader.state.lock().unwrap().yield_on_read = true;
        let feed = ProposalFeed::new(reader, 256);
        let other = Address::from_low_u64_be(77);

        // Both refreshes start before either walk finishes
        let (first, second) = tokio::join!(feed.refresh(account()), feed.refresh(other));

        assert_matches!(first, Err(ClientError::FetchCancelled));
        let second = second.unwrap();
        assert_eq!(second.account, other);
        assert_eq!(second.proposals.len(), 2);
        assert_eq!(feed.current().await, Some(second));
    }

    #[tokio::test]
    async fn test_clear_cancels_running_refresh() {
        let reader = reader_with(vec![proposal(0, "Qm0"), proposal(1, "Qm1")]);
        reader.state.lock().unwrap().yield_on_read = true;
        let feed = ProposalFeed::new(reader, 256);

        let (refreshed, ()) = tokio::join!(feed.refresh(account()), feed.clear());

        assert_matches!(refreshed, Err(ClientError::FetchCancelled));
        assert_eq!(feed.current().await, None);
    }

    #[tokio::test]
    async fn test_account_switch_refetches_or_clears() {
        let reader = reader_with(vec![proposal(0, "Qm0")]);
        let other = Address::from_low_u64_be(77);
        reader.state.lock().unwrap().votes.insert((other, 0));
        let feed = ProposalFeed::new(reader, 256);
        feed.refresh(account()).await.unwrap();

        feed.account_changed(Some(other)).await;
        let snapshot = feed.current().await.unwrap();
        assert_eq!(snapshot.account, other);
        assert!(snapshot.proposals.is_empty());

        feed.account_changed(None).await;
        assert_eq!(feed.current().await, None);
    }

    #[tokio::test]
    async fn test_clear_drops_snapshot() {
        let feed = ProposalFeed::new(reader_with(vec![proposal(0, "Qm0")]), 256);
        feed.refresh(account()).await.unwrap();
        assert!(feed.current().await.is_some());

        feed.clear().await;
        assert_eq!(feed.current().await, None);
    }

    #[tokio::test]
    async fn test_snapshot_carries_owner_and_admin() {
        let feed = ProposalFeed::new(reader_with(vec![]), 256);
        let snapshot = feed.refresh(account()).await.unwrap();
        assert_eq!(snapshot.owner, Address::from_low_u64_be(1));
        assert_eq!(snapshot.admin, Address::from_low_u64_be(2));
        assert!(snapshot.proposals.is_empty());
    }
}
