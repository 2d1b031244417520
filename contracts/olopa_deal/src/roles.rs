//! # Role derivation
//!
//! A caller's role is never stored on the deal. It is recomputed on every
//! call by comparing the caller's address with the two party addresses:
//!
//! | Address matches       | Role         | May                         |
//! |-----------------------|--------------|-----------------------------|
//! | `client_address`      | `Client`     | sign, fund, cancel          |
//! | `freelancer_address`  | `Freelancer` | sign, cancel                |
//! | neither               | `Observer`   | read only                   |
//!
//! Creation rejects deals whose two addresses are equal, so the first two
//! rows never overlap.

use crate::types::{Action, Deal, Role};
use crate::{Error, Result};

/// Return the role `address` holds on `deal`.
pub fn derive_role(deal: &Deal, address: &str) -> Role {
    let address = address.trim();
    if address.is_empty() {
        Role::Observer
    } else if address == deal.client_address {
        Role::Client
    } else if address == deal.freelancer_address {
        Role::Freelancer
    } else {
        Role::Observer
    }
}

/// Require `caller` to be one of the two parties.
pub(crate) fn require_party(deal: &Deal, caller: &str, action: Action) -> Result<Role> {
    match derive_role(deal, caller) {
        Role::Observer => Err(unauthorized(deal, caller, action)),
        role => Ok(role),
    }
}

/// Require `caller` to be the client.
pub(crate) fn require_client(deal: &Deal, caller: &str, action: Action) -> Result<()> {
    match derive_role(deal, caller) {
        Role::Client => Ok(()),
        _ => Err(unauthorized(deal, caller, action)),
    }
}

fn unauthorized(deal: &Deal, caller: &str, action: Action) -> Error {
    Error::Unauthorized {
        deal_id: deal.id.clone(),
        caller: caller.trim().to_string(),
        action,
    }
}
