//! # OLOPA Deal Lifecycle
//!
//! This is the root crate of the **OLOPA** peer-to-peer escrow product. It
//! exposes [`DealLifecycle`], whose entry points cover the full life of one
//! agreement between a client and a freelancer:
//!
//! | Phase        | Entry Point(s)                                  |
//! |--------------|-------------------------------------------------|
//! | Creation     | [`DealLifecycle::create`]                       |
//! | Signing      | [`DealLifecycle::sign`]                         |
//! | Funding      | [`DealLifecycle::fund`], [`DealLifecycle::fund_exact`] |
//! | Settlement   | [`DealLifecycle::complete`]                     |
//! | Cancellation | [`DealLifecycle::cancel`]                       |
//! | Queries      | [`DealLifecycle::derive_role`], [`DealLifecycle::available_actions`] |
//!
//! ## Architecture
//!
//! Authorization is fully delegated to [`roles`]. Input checks are fully
//! delegated to [`validation`]. Shared, serialized access to many deals lives
//! in [`storage::DealBook`]. This file contains **only** the entry points and
//! the events they emit.
//!
//! Entry points take the deal and the clock explicitly. Every guard is
//! checked before the deal is touched, so a failed call leaves it unchanged.

use chrono::{DateTime, Utc};
use thiserror::Error;

mod amount;
mod escrow;
mod events;
pub mod roles;
pub mod storage;
mod types;
pub mod validation;

#[cfg(test)]
mod test_lifecycle;

pub use amount::{Amount, AmountParseError, AMOUNT_SCALE};
pub use escrow::EscrowReference;
pub use events::{DealEvent, EventKind};
pub use roles::derive_role;
pub use storage::DealBook;
pub use types::{Action, Currency, Deal, DealDraft, DealId, DealStatus, Role, Signatures};
pub use validation::ValidationErrors;

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum Error {
    #[error("invalid deal terms: {0}")]
    Validation(ValidationErrors),

    #[error("{caller:?} is not allowed to {action} deal {deal_id}")]
    Unauthorized {
        deal_id: DealId,
        caller: String,
        action: Action,
    },

    #[error("the {role} has already signed deal {deal_id}")]
    AlreadySigned { deal_id: DealId, role: Role },

    #[error("cannot {action} deal {deal_id} while it is {status}")]
    InvalidState {
        deal_id: DealId,
        action: Action,
        status: DealStatus,
    },

    #[error("deal {deal_id} cannot complete before {finish_after}")]
    DeadlineNotReached {
        deal_id: DealId,
        finish_after: DateTime<Utc>,
    },

    #[error(
        "payment of {amount} {currency} does not match deal {deal_id} terms of {expected_amount} {expected_currency}"
    )]
    TermsMismatch {
        deal_id: DealId,
        expected_amount: Amount,
        expected_currency: Currency,
        amount: Amount,
        currency: Currency,
    },

    #[error("deal {0} not found")]
    DealNotFound(DealId),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Entry points of the deal state machine.
pub struct DealLifecycle;

impl DealLifecycle {
    // ─────────────────────────────────────────────────────────
    // Creation
    // ─────────────────────────────────────────────────────────

    /// Validate `draft` and build a new `Pending` deal created by
    /// `client_address`.
    ///
    /// Fails with [`Error::Validation`] naming every offending field; no
    /// deal exists on failure.
    pub fn create(
        id: DealId,
        draft: &DealDraft,
        client_address: &str,
        now: DateTime<Utc>,
    ) -> Result<(Deal, DealEvent)> {
        let terms =
            validation::validate_draft(draft, client_address, now).map_err(Error::Validation)?;

        let deal = Deal {
            id,
            title: terms.title,
            description: terms.description,
            amount: terms.amount,
            currency: terms.currency,
            client_address: terms.client_address,
            freelancer_address: terms.freelancer_address,
            deadline_days: terms.deadline_days,
            created_at: now,
            finish_after: terms.finish_after,
            signatures: Signatures::default(),
            status: DealStatus::Pending,
            escrow_reference: None,
            funded_at: None,
        };

        let event = DealEvent {
            kind: EventKind::DealCreated,
            deal_id: deal.id.clone(),
            actor: Some(deal.client_address.clone()),
            role: Some(Role::Client),
            status: deal.status,
            at: now,
        };
        Ok((deal, event))
    }

    // ─────────────────────────────────────────────────────────
    // Signing
    // ─────────────────────────────────────────────────────────

    /// Record the caller's signature.
    ///
    /// The status moves to `Signed` exactly once, when the second signature
    /// lands. A repeated signature is rejected with [`Error::AlreadySigned`]
    /// and leaves the deal untouched.
    pub fn sign(deal: &mut Deal, caller: &str, now: DateTime<Utc>) -> Result<DealEvent> {
        let role = roles::require_party(deal, caller, Action::Sign)?;

        if deal.signatures.has_signed(role) {
            return Err(Error::AlreadySigned {
                deal_id: deal.id.clone(),
                role,
            });
        }
        if deal.status != DealStatus::Pending {
            return Err(invalid_state(deal, Action::Sign));
        }

        deal.signatures.mark(role);
        let kind = if deal.signatures.both() {
            deal.status = DealStatus::Signed;
            EventKind::DealFullySigned
        } else {
            EventKind::DealSigned
        };

        Ok(DealEvent {
            kind,
            deal_id: deal.id.clone(),
            actor: Some(caller.trim().to_string()),
            role: Some(role),
            status: deal.status,
            at: now,
        })
    }

    // ─────────────────────────────────────────────────────────
    // Funding
    // ─────────────────────────────────────────────────────────

    /// Lock the escrow for a fully signed deal.
    ///
    /// Only the client may fund. Assigns the escrow reference.
    pub fn fund(deal: &mut Deal, caller: &str, now: DateTime<Utc>) -> Result<DealEvent> {
        roles::require_client(deal, caller, Action::Fund)?;

        if deal.status != DealStatus::Signed || !deal.signatures.both() {
            return Err(invalid_state(deal, Action::Fund));
        }

        deal.escrow_reference = Some(EscrowReference::derive(deal, now));
        deal.funded_at = Some(now);
        deal.status = DealStatus::Funded;

        Ok(DealEvent {
            kind: EventKind::EscrowFunded,
            deal_id: deal.id.clone(),
            actor: Some(caller.trim().to_string()),
            role: Some(Role::Client),
            status: deal.status,
            at: now,
        })
    }

    /// Like [`DealLifecycle::fund`], but also checks that the offered payment
    /// matches the deal's amount and currency.
    pub fn fund_exact(
        deal: &mut Deal,
        caller: &str,
        amount: Amount,
        currency: Currency,
        now: DateTime<Utc>,
    ) -> Result<DealEvent> {
        roles::require_client(deal, caller, Action::Fund)?;
        if deal.status != DealStatus::Signed {
            return Err(invalid_state(deal, Action::Fund));
        }
        if amount != deal.amount || currency != deal.currency {
            return Err(Error::TermsMismatch {
                deal_id: deal.id.clone(),
                expected_amount: deal.amount,
                expected_currency: deal.currency,
                amount,
                currency,
            });
        }
        Self::fund(deal, caller, now)
    }

    // ─────────────────────────────────────────────────────────
    // Settlement and cancellation
    // ─────────────────────────────────────────────────────────

    /// Settle a funded deal once its deadline has passed.
    ///
    /// Clock-driven: there is no caller check.
    pub fn complete(deal: &mut Deal, now: DateTime<Utc>) -> Result<DealEvent> {
        if deal.status != DealStatus::Funded {
            return Err(invalid_state(deal, Action::Complete));
        }
        if now < deal.finish_after {
            return Err(Error::DeadlineNotReached {
                deal_id: deal.id.clone(),
                finish_after: deal.finish_after,
            });
        }

        deal.status = DealStatus::Completed;

        Ok(DealEvent {
            kind: EventKind::DealCompleted,
            deal_id: deal.id.clone(),
            actor: None,
            role: None,
            status: deal.status,
            at: now,
        })
    }

    /// Abandon a deal before it is funded. Either party may cancel.
    pub fn cancel(deal: &mut Deal, caller: &str, now: DateTime<Utc>) -> Result<DealEvent> {
        let role = roles::require_party(deal, caller, Action::Cancel)?;

        if deal.status.is_terminal() || deal.status == DealStatus::Funded {
            return Err(invalid_state(deal, Action::Cancel));
        }

        deal.status = DealStatus::Cancelled;

        Ok(DealEvent {
            kind: EventKind::DealCancelled,
            deal_id: deal.id.clone(),
            actor: Some(caller.trim().to_string()),
            role: Some(role),
            status: deal.status,
            at: now,
        })
    }

    // ─────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────

    /// Return the role `address` holds on `deal`.
    pub fn derive_role(deal: &Deal, address: &str) -> Role {
        roles::derive_role(deal, address)
    }

    /// Transitions `address` may legally take on `deal` at `now`, in the
    /// order a UI should offer them.
    pub fn available_actions(deal: &Deal, address: &str, now: DateTime<Utc>) -> Vec<Action> {
        let role = roles::derive_role(deal, address);
        let mut actions = Vec::new();

        match deal.status {
            DealStatus::Pending => {
                if role.is_party() && !deal.signatures.has_signed(role) {
                    actions.push(Action::Sign);
                }
            }
            DealStatus::Signed => {
                if role == Role::Client {
                    actions.push(Action::Fund);
                }
            }
            DealStatus::Funded => {
                if now >= deal.finish_after {
                    actions.push(Action::Complete);
                }
            }
            DealStatus::Completed | DealStatus::Cancelled => {}
        }

        if role.is_party() && !deal.status.is_terminal() && deal.status != DealStatus::Funded {
            actions.push(Action::Cancel);
        }
        actions
    }
}

fn invalid_state(deal: &Deal, action: Action) -> Error {
    Error::InvalidState {
        deal_id: deal.id.clone(),
        action,
        status: deal.status,
    }
}
