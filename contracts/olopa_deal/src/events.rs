//! Lifecycle events emitted by every successful transition.
//!
//! The deal book keeps them as an ordered per-deal history; a hosting
//! service exposes that history read-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DealId, DealStatus, Role};

/// All event kinds a deal can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The client created the deal.
    DealCreated,
    /// One party signed; the other signature is still missing.
    DealSigned,
    /// The second signature arrived and the deal moved to `signed`.
    DealFullySigned,
    /// The client locked the escrow.
    EscrowFunded,
    /// The deadline passed and the escrow settled.
    DealCompleted,
    /// A party abandoned the deal before funding.
    DealCancelled,
}

impl EventKind {
    /// Short identifier used in logs and API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DealCreated => "deal_created",
            Self::DealSigned => "deal_signed",
            Self::DealFullySigned => "deal_fully_signed",
            Self::EscrowFunded => "escrow_funded",
            Self::DealCompleted => "deal_completed",
            Self::DealCancelled => "deal_cancelled",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealEvent {
    pub kind: EventKind,
    pub deal_id: DealId,
    /// Address that triggered the transition; `None` for clock-driven ones.
    pub actor: Option<String>,
    pub role: Option<Role>,
    /// Status after the transition.
    pub status: DealStatus,
    pub at: DateTime<Utc>,
}
