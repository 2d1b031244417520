//! # Types
//!
//! Shared data structures used across all modules of the deal lifecycle.
//!
//! ## Status as a Finite-State Machine
//!
//! [`DealStatus`] enforces a strict forward-only lifecycle:
//!
//! ```text
//! Pending ──► Signed ──► Funded ──► Completed
//!    │           │
//!    └───────────┴──► Cancelled
//! ```
//!
//! `Pending → Signed` happens exactly once, when the second of the two
//! parties signs. Backward transitions and transitions out of terminal states
//! (`Completed`, `Cancelled`) are rejected by the lifecycle entry points.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::escrow::EscrowReference;

/// Opaque deal identifier, `DEAL-<created_at millis>-<sequence>`.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DealId(String);

impl DealId {
    pub fn new(created_at: DateTime<Utc>, sequence: u64) -> Self {
        DealId(format!("DEAL-{}-{sequence}", created_at.timestamp_millis()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for DealId {
    fn from(raw: String) -> Self {
        DealId(raw)
    }
}

impl From<&str> for DealId {
    fn from(raw: &str) -> Self {
        DealId(raw.to_string())
    }
}

impl fmt::Display for DealId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Settlement asset of a deal.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    #[serde(rename = "XRP")]
    Xrp,
    #[serde(rename = "RLUSD")]
    Rlusd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xrp => "XRP",
            Self::Rlusd => "RLUSD",
        }
    }
}

impl FromStr for Currency {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "XRP" => Ok(Self::Xrp),
            "RLUSD" => Ok(Self::Rlusd),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a deal.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    /// Created; collecting signatures.
    Pending,
    /// Both parties signed; awaiting the client's escrow deposit.
    Signed,
    /// Funds locked in escrow until `finish_after`.
    Funded,
    /// Deadline passed; escrow settled to the freelancer.
    Completed,
    /// Abandoned before funding.
    Cancelled,
}

impl DealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Signed => "signed",
            Self::Funded => "funded",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for DealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A party's relationship to one deal. Derived from addresses, never stored.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Freelancer,
    Observer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Freelancer => "freelancer",
            Self::Observer => "observer",
        }
    }

    pub fn is_party(&self) -> bool {
        !matches!(self, Self::Observer)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transitions a caller can attempt on a deal.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Sign,
    Fund,
    Complete,
    Cancel,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sign => "sign",
            Self::Fund => "fund",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-role signature flags.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Signatures {
    pub client: bool,
    pub freelancer: bool,
}

impl Signatures {
    /// Observers never have a signature.
    pub fn has_signed(&self, role: Role) -> bool {
        match role {
            Role::Client => self.client,
            Role::Freelancer => self.freelancer,
            Role::Observer => false,
        }
    }

    pub(crate) fn mark(&mut self, role: Role) {
        match role {
            Role::Client => self.client = true,
            Role::Freelancer => self.freelancer = true,
            Role::Observer => {}
        }
    }

    pub fn both(&self) -> bool {
        self.client && self.freelancer
    }
}

/// Raw deal terms as submitted by the creation form, before validation.
///
/// Every field is held as a string so that validation can report
/// field-level messages instead of a deserialization failure. Missing fields
/// deserialize as empty, and numeric `amount`/`deadline` values are accepted
/// as their decimal text.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub amount: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub freelancer_address: String,
    #[serde(default = "default_deadline", deserialize_with = "string_or_number")]
    pub deadline: String,
    #[serde(default)]
    pub description: String,
}

fn default_currency() -> String {
    Currency::default().as_str().to_string()
}

fn default_deadline() -> String {
    "7".to_string()
}

/// Accept a JSON string or number as text; `null` becomes empty.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrNumber;

    impl<'de> Visitor<'de> for StringOrNumber {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string or a number")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_unit<E: de::Error>(self) -> Result<String, E> {
            Ok(String::new())
        }

        fn visit_none<E: de::Error>(self) -> Result<String, E> {
            Ok(String::new())
        }
    }

    deserializer.deserialize_any(StringOrNumber)
}

/// A two-party agreement tracked from creation to settlement.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    /// Unique identifier, assigned at creation.
    pub id: DealId,
    /// Trimmed, non-empty title.
    pub title: String,
    pub description: String,
    /// Escrow amount, always positive.
    pub amount: Amount,
    pub currency: Currency,
    /// Creator of the deal; the only party allowed to fund it.
    pub client_address: String,
    /// Counterparty who receives the escrow on completion.
    pub freelancer_address: String,
    /// Days between creation and `finish_after`; at least 1.
    pub deadline_days: u32,
    pub created_at: DateTime<Utc>,
    /// Earliest instant at which a funded deal may complete.
    pub finish_after: DateTime<Utc>,
    pub signatures: Signatures,
    /// Current lifecycle status.
    pub status: DealStatus,
    /// Set exactly when the deal is funded or completed.
    pub escrow_reference: Option<EscrowReference>,
    pub funded_at: Option<DateTime<Utc>>,
}
