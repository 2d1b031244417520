//! Field-level validation of a [`DealDraft`].
//!
//! All checks run before a deal is constructed and every failing field is
//! reported at once, keyed by the form field name.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::types::{Currency, DealDraft};

pub const FIELD_TITLE: &str = "title";
pub const FIELD_AMOUNT: &str = "amount";
pub const FIELD_CURRENCY: &str = "currency";
pub const FIELD_FREELANCER: &str = "freelancerAddress";
pub const FIELD_DEADLINE: &str = "deadline";
pub const FIELD_CLIENT: &str = "clientAddress";

/// Mapping from form field to a human-readable message.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: &str, message: impl Into<String>) {
        self.0.insert(field.to_string(), message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Terms that passed validation, ready to become a deal.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidTerms {
    pub title: String,
    pub description: String,
    pub amount: Amount,
    pub currency: Currency,
    pub client_address: String,
    pub freelancer_address: String,
    pub deadline_days: u32,
    pub finish_after: DateTime<Utc>,
}

/// Validate a draft submitted by `client_address` at `now`.
pub fn validate_draft(
    draft: &DealDraft,
    client_address: &str,
    now: DateTime<Utc>,
) -> Result<ValidTerms, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let title = draft.title.trim();
    if title.is_empty() {
        errors.insert(FIELD_TITLE, "Deal title is required");
    }

    let amount = match draft.amount.parse::<Amount>() {
        Ok(amount) if amount.is_positive() => Some(amount),
        _ => {
            errors.insert(FIELD_AMOUNT, "Valid amount required");
            None
        }
    };

    let currency = match draft.currency.parse::<Currency>() {
        Ok(currency) => Some(currency),
        Err(()) => {
            errors.insert(FIELD_CURRENCY, "Currency must be XRP or RLUSD");
            None
        }
    };

    let client = client_address.trim();
    if client.is_empty() {
        errors.insert(FIELD_CLIENT, "Connect a wallet before creating a deal");
    }

    let freelancer = draft.freelancer_address.trim();
    if freelancer.is_empty() {
        errors.insert(FIELD_FREELANCER, "Freelancer address required");
    } else if freelancer == client {
        errors.insert(
            FIELD_FREELANCER,
            "Freelancer address must differ from client address",
        );
    }

    let deadline = match draft.deadline.trim().parse::<u32>() {
        Ok(days) if days >= 1 => {
            match now.checked_add_signed(Duration::days(i64::from(days))) {
                Some(finish_after) => Some((days, finish_after)),
                None => {
                    errors.insert(FIELD_DEADLINE, "Deadline is too far in the future");
                    None
                }
            }
        }
        _ => {
            errors.insert(FIELD_DEADLINE, "Deadline must be at least 1 day");
            None
        }
    };

    match (amount, currency, deadline) {
        (Some(amount), Some(currency), Some((deadline_days, finish_after))) if errors.is_empty() => {
            Ok(ValidTerms {
                title: title.to_string(),
                description: draft.description.trim().to_string(),
                amount,
                currency,
                client_address: client.to_string(),
                freelancer_address: freelancer.to_string(),
                deadline_days,
                finish_after,
            })
        }
        _ => Err(errors),
    }
}
