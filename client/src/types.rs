//! Common types shared across the governance client.
//!
//! This module defines the session record, the role enumeration, proposal
//! records as stored on chain and the receipts returned by the node.

use chrono::{DateTime, Utc};
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction hash type (0x-prefixed hex)
pub type TransactionHash = String;

/// Role of an account inside the DAO
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Owner of the governance contract
    Owner,
    /// Admin of the governance contract
    Admin,
    /// Holder of the governance token
    Member,
    /// Connected account without tokens
    Guest,
    /// No session, or role not resolved yet
    #[default]
    None,
}

impl Role {
    /// Label shown next to the account, empty for [`Role::None`]
    pub fn label(&self) -> &'static str {
        match self {
            Role::Owner => "OWNER",
            Role::Admin => "ADMIN",
            Role::Member => "MEMBER",
            Role::Guest => "GUEST",
            Role::None => "",
        }
    }

    /// Owner or admin
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Client-side record of the connected wallet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Active account
    pub account: Option<Address>,
    /// Chain the wallet reported last
    pub chain_id: Option<u64>,
    /// Derived role of the active account
    pub role: Role,
    /// When the session was established
    pub connected_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Whether an account is connected
    pub fn is_connected(&self) -> bool {
        self.account.is_some()
    }
}

/// Owner, admin and token balance as read for one account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoleReading {
    /// `owner()` of the governance contract
    pub owner: Address,
    /// `admin()` of the governance contract
    pub admin: Address,
    /// Governance token `balanceOf(account)`
    pub balance: U256,
}

impl RoleReading {
    /// Whether `account` may close votes
    pub fn is_owner_or_admin(&self, account: Address) -> bool {
        account == self.owner || account == self.admin
    }
}

/// Proposal record as returned by `proposals(index)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Proposal id used by `vote` and `votesHistory`
    pub id: u64,
    /// Display name
    pub name: String,
    /// Image URL or content hash
    pub source: String,
}

/// Proposal the current account has not voted on, ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenProposal {
    /// On-chain record
    pub proposal: Proposal,
    /// Gateway-normalized image URL, `None` when the record has no image
    pub processed_image_url: Option<String>,
}

/// Transaction receipt status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    /// Receipt status 0x1
    Success,
    /// Receipt status 0x0
    Reverted,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Success => write!(f, "SUCCESS"),
            TransactionStatus::Reverted => write!(f, "REVERTED"),
        }
    }
}

/// Mined transaction receipt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    /// Transaction hash
    pub transaction_hash: TransactionHash,
    /// Final status
    pub status: TransactionStatus,
    /// Block the transaction was mined in
    pub block_number: Option<u64>,
}

/// Transaction request handed to the wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Sender
    pub from: Address,
    /// Contract called
    pub to: Address,
    /// ABI encoded call data, 0x-prefixed hex
    pub data: String,
}
