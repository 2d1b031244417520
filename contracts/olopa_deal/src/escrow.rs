//! Escrow settlement references.
//!
//! A reference is the SHA-256 digest of the funded deal's terms and the
//! funding instant, hex encoded. It has the shape of a ledger transaction
//! hash so a hosting UI can display it in the same place, but nothing is
//! ever submitted to a ledger.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::Deal;

/// Field separator fed to the hasher between variable-length fields.
const SEPARATOR: &[u8] = &[0x1f];

/// 64 lowercase hex characters identifying one escrow deposit.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EscrowReference(String);

impl EscrowReference {
    /// Derive the reference for `deal` funded at `funded_at`.
    pub fn derive(deal: &Deal, funded_at: DateTime<Utc>) -> Self {
        let mut hasher = Sha256::new();
        for field in [
            deal.id.as_str().as_bytes(),
            deal.client_address.as_bytes(),
            deal.freelancer_address.as_bytes(),
            deal.currency.as_str().as_bytes(),
        ] {
            hasher.update(field);
            hasher.update(SEPARATOR);
        }
        hasher.update(deal.amount.drops().to_be_bytes());
        hasher.update(funded_at.timestamp_millis().to_be_bytes());
        EscrowReference(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EscrowReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
