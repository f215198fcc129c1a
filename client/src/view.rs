//! Framework-neutral view models for the header and the voting table.

use crate::gateway::display_image;
use crate::types::{OpenProposal, Role, RoleReading, Session};
use ethers::types::Address;
use ethers::utils::to_checksum;
use serde::Serialize;

/// Application title shown in the header
pub const APP_TITLE: &str = "Vegan Rob's DAO";

/// Heading of the voting page
pub const VOTE_HEADING: &str = "Vote to New Products Election";

/// Characters of the checksummed address kept in the short label
const SHORT_ADDRESS_LEN: usize = 8;

/// Shortened account label, e.g. `0x5aAeb6...`
pub fn short_address(address: &Address) -> String {
    let checksummed = to_checksum(address, None);
    format!("{}...", &checksummed[..SHORT_ADDRESS_LEN])
}

/// Navigation header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderView {
    /// Application title
    pub title: &'static str,
    /// `Connect Wallet` or `Disconnect`
    pub button_label: &'static str,
    /// Shortened account, `None` when disconnected
    pub account_label: Option<String>,
    /// Full checksummed account
    pub account_tooltip: Option<String>,
    /// Role label, empty when unresolved
    pub role_label: &'static str,
}

impl HeaderView {
    /// Header for the given session
    pub fn from_session(session: &Session) -> Self {
        match session.account {
            Some(account) => Self {
                title: APP_TITLE,
                button_label: "Disconnect",
                account_label: Some(short_address(&account)),
                account_tooltip: Some(to_checksum(&account, None)),
                role_label: session.role.label(),
            },
            None => Self {
                title: APP_TITLE,
                button_label: "Connect Wallet",
                account_label: None,
                account_tooltip: None,
                role_label: Role::None.label(),
            },
        }
    }
}

/// One row of the voting table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProposalRow {
    /// 1-based election number
    pub number: usize,
    /// Proposal id the buttons act on
    pub proposal_id: u64,
    /// Image to show, the placeholder when the proposal has none
    pub image_url: String,
    /// Proposal name
    pub name: String,
    /// Yes/No buttons disabled
    pub vote_disabled: bool,
    /// Close button shown
    pub close_visible: bool,
    /// Close button disabled
    pub close_disabled: bool,
}

impl ProposalRow {
    /// Build the row at `position` (0-based) in the feed
    pub fn build(
        position: usize,
        open: &OpenProposal,
        session: &Session,
        reading: &RoleReading,
    ) -> Self {
        let privileged = session
            .account
            .map_or(false, |account| reading.is_owner_or_admin(account));

        Self {
            number: position + 1,
            proposal_id: open.proposal.id,
            image_url: display_image(open.processed_image_url.as_deref()).to_string(),
            name: open.proposal.name.clone(),
            vote_disabled: session.role == Role::Guest,
            close_visible: privileged,
            close_disabled: !session.role.is_privileged(),
        }
    }
}

/// Voting page: heading plus one row per open proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VotePage {
    /// Page heading
    pub heading: &'static str,
    /// Rows in feed order
    pub rows: Vec<ProposalRow>,
}

impl VotePage {
    /// Build the page for the given feed
    pub fn build(proposals: &[OpenProposal], session: &Session, reading: &RoleReading) -> Self {
        Self {
            heading: VOTE_HEADING,
            rows: proposals
                .iter()
                .enumerate()
                .map(|(position, open)| ProposalRow::build(position, open, session, reading))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::PLACEHOLDER_IMAGE;
    use crate::types::Proposal;
    use ethers::types::U256;
    use std::str::FromStr;
    use test_case::test_case;

    const ACCOUNT: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";

    fn account() -> Address {
        Address::from_str(ACCOUNT).unwrap()
    }

    fn session(role: Role) -> Session {
        Session {
            account: Some(account()),
            chain_id: Some(crate::config::HARMONY_CHAIN_ID),
            role,
            connected_at: None,
        }
    }

    fn open(id: u64, image: Option<&str>) -> OpenProposal {
        OpenProposal {
            proposal: Proposal {
                id,
                name: format!("Election {}", id),
                source: image.unwrap_or_default().to_string(),
            },
            processed_image_url: image.map(str::to_string),
        }
    }

    fn reading(owner: Address) -> RoleReading {
        RoleReading {
            owner,
            admin: Address::from_low_u64_be(2),
            balance: U256::zero(),
        }
    }

    #[test]
    fn test_header_disconnected() {
        let header = HeaderView::from_session(&Session::default());
        assert_eq!(header.title, "Vegan Rob's DAO");
        assert_eq!(header.button_label, "Connect Wallet");
        assert_eq!(header.account_label, None);
        assert_eq!(header.role_label, "");
    }

    #[test]
    fn test_header_connected() {
        let header = HeaderView::from_session(&session(Role::Member));
        assert_eq!(header.button_label, "Disconnect");
        assert_eq!(header.account_label.as_deref(), Some("0x5aAeb6..."));
        assert_eq!(
            header.account_tooltip.as_deref(),
            Some("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed")
        );
        assert_eq!(header.role_label, "MEMBER");
    }

    #[test_case(Role::Owner, false, false ; "owner")]
    #[test_case(Role::Admin, false, false ; "admin")]
    #[test_case(Role::Member, false, true ; "member")]
    #[test_case(Role::Guest, true, true ; "guest")]
    fn test_row_buttons(role: Role, vote_disabled: bool, close_disabled: bool) {
        let row = ProposalRow::build(0, &open(7, None), &session(role), &reading(account()));
        assert_eq!(row.vote_disabled, vote_disabled);
        assert_eq!(row.close_disabled, close_disabled);
        assert!(row.close_visible);
    }

    #[test]
    fn test_close_hidden_for_non_privileged_account() {
        let reading = reading(Address::from_low_u64_be(1));
        let row = ProposalRow::build(0, &open(7, None), &session(Role::Member), &reading);
        assert!(!row.close_visible);
    }

    #[test]
    fn test_page_rows() {
        let proposals = vec![
            open(4, Some("https://gateway.pinata.cloud/ipfs/Qm4")),
            open(9, None),
        ];
        let page = VotePage::build(&proposals, &session(Role::Member), &reading(account()));

        assert_eq!(page.heading, "Vote to New Products Election");
        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.rows[0].number, 1);
        assert_eq!(page.rows[0].proposal_id, 4);
        assert_eq!(page.rows[0].image_url, "https://gateway.pinata.cloud/ipfs/Qm4");
        assert_eq!(page.rows[1].number, 2);
        assert_eq!(page.rows[1].name, "Election 9");
        assert_eq!(page.rows[1].image_url, PLACEHOLDER_IMAGE);
    }
}
