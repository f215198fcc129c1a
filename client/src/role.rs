//! Role resolution.

use crate::types::{Role, RoleReading};
use ethers::types::Address;

/// Derive the role of `account` from a fresh [`RoleReading`].
///
/// Precedence is owner, then admin, then token holder, then guest: an owner
/// who also holds tokens is still [`Role::Owner`].
pub fn resolve_role(account: Address, reading: &RoleReading) -> Role {
    if account == reading.owner {
        Role::Owner
    } else if account == reading.admin {
        Role::Admin
    } else if !reading.balance.is_zero() {
        Role::Member
    } else {
        Role::Guest
    }
}
