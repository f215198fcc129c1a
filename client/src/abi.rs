//! ABI encoding for the governance and token contract surfaces.

use crate::error::{ClientError, Result};
use crate::types::Proposal;
use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, U256};
use ethers::utils::id;

/// `owner()`
pub const OWNER: &str = "owner()";
/// `admin()`
pub const ADMIN: &str = "admin()";
/// `proposalIndex()`
pub const PROPOSAL_INDEX: &str = "proposalIndex()";
/// `proposals(uint256)`
pub const PROPOSALS: &str = "proposals(uint256)";
/// `votesHistory(address,uint256)`
pub const VOTES_HISTORY: &str = "votesHistory(address,uint256)";
/// `vote(uint256,bool)`
pub const VOTE: &str = "vote(uint256,bool)";
/// `stopVoting(uint256)`
pub const STOP_VOTING: &str = "stopVoting(uint256)";
/// `balanceOf(address)`
pub const BALANCE_OF: &str = "balanceOf(address)";

/// Selector followed by the ABI encoded arguments
pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut data = id(signature).to_vec();
    data.extend(abi::encode(args));
    data
}

fn decode_single(signature: &str, kind: ParamType, data: &[u8]) -> Result<Token> {
    abi::decode(&[kind], data)
        .map_err(|e| ClientError::InvalidResponse(format!("{}: {}", signature, e)))?
        .into_iter()
        .next()
        .ok_or_else(|| ClientError::InvalidResponse(format!("{}: empty result", signature)))
}

/// Decode an `address` return value
pub fn decode_address(signature: &str, data: &[u8]) -> Result<Address> {
    decode_single(signature, ParamType::Address, data)?
        .into_address()
        .ok_or_else(|| ClientError::InvalidResponse(format!("{}: not an address", signature)))
}

/// Decode a `uint256` return value
pub fn decode_uint(signature: &str, data: &[u8]) -> Result<U256> {
    decode_single(signature, ParamType::Uint(256), data)?
        .into_uint()
        .ok_or_else(|| ClientError::InvalidResponse(format!("{}: not a uint", signature)))
}

/// Decode a `bool` return value
pub fn decode_bool(signature: &str, data: &[u8]) -> Result<bool> {
    decode_single(signature, ParamType::Bool, data)?
        .into_bool()
        .ok_or_else(|| ClientError::InvalidResponse(format!("{}: not a bool", signature)))
}

/// Narrow a `uint256` to `u64`
pub fn uint_to_u64(signature: &str, value: U256) -> Result<u64> {
    if value > U256::from(u64::MAX) {
        return Err(ClientError::InvalidResponse(format!(
            "{}: {} overflows u64",
            signature, value
        )));
    }
    Ok(value.as_u64())
}

/// Decode the leading `(uint256 id, string name, string source)` of a proposal
/// record; any further struct members are ignored.
pub fn decode_proposal(data: &[u8]) -> Result<Proposal> {
    let tokens = abi::decode(
        &[ParamType::Uint(256), ParamType::String, ParamType::String],
        data,
    )
    .map_err(|e| ClientError::InvalidResponse(format!("{}: {}", PROPOSALS, e)))?;

    let mut tokens = tokens.into_iter();
    let id = tokens
        .next()
        .and_then(Token::into_uint)
        .ok_or_else(|| ClientError::InvalidResponse(format!("{}: missing id", PROPOSALS)))?;
    let name = tokens
        .next()
        .and_then(Token::into_string)
        .ok_or_else(|| ClientError::InvalidResponse(format!("{}: missing name", PROPOSALS)))?;
    let source = tokens
        .next()
        .and_then(Token::into_string)
        .ok_or_else(|| ClientError::InvalidResponse(format!("{}: missing source", PROPOSALS)))?;

    Ok(Proposal {
        id: uint_to_u64(PROPOSALS, id)?,
        name,
        source,
    })
}

/// `vote(proposal_id, support)` call data
pub fn vote_call(proposal_id: u64, support: bool) -> Vec<u8> {
    encode_call(
        VOTE,
        &[Token::Uint(U256::from(proposal_id)), Token::Bool(support)],
    )
}

/// `stopVoting(proposal_id)` call data
pub fn stop_voting_call(proposal_id: u64) -> Vec<u8> {
    encode_call(STOP_VOTING, &[Token::Uint(U256::from(proposal_id))])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selectors() {
        // ERC-20 balanceOf and Ownable owner are well known
        assert_eq!(hex::encode(id(BALANCE_OF)), "70a08231");
        assert_eq!(hex::encode(id(OWNER)), "8da5cb5b");
    }

    #[test]
    fn test_vote_call_layout() {
        let data = vote_call(3, true);
        assert_eq!(data.len(), 4 + 32 + 32);
        assert_eq!(&data[..4], &id(VOTE)[..]);
        assert_eq!(data[35], 3);
        assert_eq!(data[67], 1);

        let against = vote_call(3, false);
        assert_eq!(against[67], 0);
    }

    #[test]
    fn test_stop_voting_call_layout() {
        let data = stop_voting_call(258);
        assert_eq!(data.len(), 36);
        assert_eq!(&data[..4], &id(STOP_VOTING)[..]);
        assert_eq!(&data[34..36], &[1, 2]);
    }

    #[test]
    fn test_decode_proposal_with_extra_members() {
        let data = abi::encode(&[
            Token::Uint(U256::from(7)),
            Token::String("Oat milk".to_string()),
            Token::String("QmHash".to_string()),
            Token::Uint(U256::from(12)),
            Token::Bool(true),
        ]);

        let proposal = decode_proposal(&data).unwrap();
        assert_eq!(proposal.id, 7);
        assert_eq!(proposal.name, "Oat milk");
        assert_eq!(proposal.source, "QmHash");
    }

    #[test]
    fn test_decode_scalars() {
        let owner = Address::from_low_u64_be(42);
        let data = abi::encode(&[Token::Address(owner)]);
        assert_eq!(decode_address(OWNER, &data).unwrap(), owner);

        let data = abi::encode(&[Token::Uint(U256::from(5))]);
        assert_eq!(decode_uint(BALANCE_OF, &data).unwrap(), U256::from(5));

        let data = abi::encode(&[Token::Bool(true)]);
        assert!(decode_bool(VOTES_HISTORY, &data).unwrap());
    }

    #[test]
    fn test_decode_empty_result_fails() {
        assert!(decode_address(OWNER, &[]).is_err());
        assert!(decode_proposal(&[]).is_err());
    }

    #[test]
    fn test_uint_overflow() {
        assert!(uint_to_u64(PROPOSAL_INDEX, U256::MAX).is_err());
        assert_eq!(uint_to_u64(PROPOSAL_INDEX, U256::from(9)).unwrap(), 9);
    }
}
