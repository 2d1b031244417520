//! # Storage
//!
//! [`DealBook`] is the in-memory home of every deal a host process knows
//! about. Nothing is persisted.
//!
//! | Field           | Type                                | Description                       |
//! |-----------------|-------------------------------------|-----------------------------------|
//! | `next_sequence` | `AtomicU64`                         | Suffix counter for new deal ids   |
//! | `entries`       | `RwLock<HashMap<DealId, Entry>>`    | One mutex-guarded entry per deal  |
//!
//! Each entry holds the deal and its ordered event history behind its own
//! `Mutex`, so mutations of one deal are serialized while different deals
//! never contend. The map lock is held only long enough to clone an entry
//! handle.
//!
//! Transitions run against a copy of the deal and are written back only on
//! success.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};

use crate::types::{Currency, Deal, DealDraft, DealId, DealStatus};
use crate::{roles, Amount, DealEvent, DealLifecycle, Error, Result};

struct DealEntry {
    deal: Deal,
    events: Vec<DealEvent>,
}

type Entry = Arc<Mutex<DealEntry>>;

#[derive(Default)]
pub struct DealBook {
    next_sequence: AtomicU64,
    entries: RwLock<HashMap<DealId, Entry>>,
}

impl DealBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sequence number for the *current* deal (pre-increment).
    fn get_and_increment_sequence(&self) -> u64 {
        self.next_sequence.fetch_add(1, Ordering::Relaxed)
    }

    fn entry(&self, id: &DealId) -> Result<Entry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| Error::DealNotFound(id.clone()))
    }

    fn snapshot(&self) -> Vec<Deal> {
        let entries: Vec<Entry> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        let mut deals: Vec<Deal> = entries
            .iter()
            .map(|entry| entry.lock().unwrap_or_else(PoisonError::into_inner).deal.clone())
            .collect();
        deals.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        deals
    }

    /// Apply one transition to a copy of the deal under its lock.
    fn apply<F>(&self, id: &DealId, transition: F) -> Result<(Deal, DealEvent)>
    where
        F: FnOnce(&mut Deal) -> Result<DealEvent>,
    {
        let entry = self.entry(id)?;
        let mut guard = entry.lock().unwrap_or_else(PoisonError::into_inner);

        let mut next = guard.deal.clone();
        let event = transition(&mut next)?;

        guard.deal = next;
        guard.events.push(event.clone());
        Ok((guard.deal.clone(), event))
    }

    // ─────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────

    /// Validate `draft`, assign a fresh id and store the new deal.
    pub fn create(
        &self,
        draft: &DealDraft,
        client_address: &str,
        now: DateTime<Utc>,
    ) -> Result<(Deal, DealEvent)> {
        let id = DealId::new(now, self.get_and_increment_sequence());
        let (deal, event) = DealLifecycle::create(id, draft, client_address, now)?;

        let entry = DealEntry {
            deal: deal.clone(),
            events: vec![event.clone()],
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(deal.id.clone(), Arc::new(Mutex::new(entry)));
        Ok((deal, event))
    }

    pub fn sign(&self, id: &DealId, caller: &str, now: DateTime<Utc>) -> Result<(Deal, DealEvent)> {
        self.apply(id, |deal| DealLifecycle::sign(deal, caller, now))
    }

    pub fn fund(&self, id: &DealId, caller: &str, now: DateTime<Utc>) -> Result<(Deal, DealEvent)> {
        self.apply(id, |deal| DealLifecycle::fund(deal, caller, now))
    }

    pub fn fund_exact(
        &self,
        id: &DealId,
        caller: &str,
        amount: Amount,
        currency: Currency,
        now: DateTime<Utc>,
    ) -> Result<(Deal, DealEvent)> {
        self.apply(id, |deal| {
            DealLifecycle::fund_exact(deal, caller, amount, currency, now)
        })
    }

    pub fn complete(&self, id: &DealId, now: DateTime<Utc>) -> Result<(Deal, DealEvent)> {
        self.apply(id, |deal| DealLifecycle::complete(deal, now))
    }

    pub fn cancel(&self, id: &DealId, caller: &str, now: DateTime<Utc>) -> Result<(Deal, DealEvent)> {
        self.apply(id, |deal| DealLifecycle::cancel(deal, caller, now))
    }

    /// Complete every funded deal whose deadline has passed at `now`.
    pub fn complete_due(&self, now: DateTime<Utc>) -> Result<Vec<(Deal, DealEvent)>> {
        let due: Vec<DealId> = self
            .snapshot()
            .into_iter()
            .filter(|deal| deal.status == DealStatus::Funded && now >= deal.finish_after)
            .map(|deal| deal.id)
            .collect();
        self.complete_each(&due, now)
    }

    /// Complete `ids` in order. A deal that is no longer funded was settled by
    /// another caller since it was selected and is skipped; any other error
    /// stops the pass.
    pub(crate) fn complete_each(
        &self,
        ids: &[DealId],
        now: DateTime<Utc>,
    ) -> Result<Vec<(Deal, DealEvent)>> {
        let mut settled = Vec::with_capacity(ids.len());
        for id in ids {
            match self.complete(id, now) {
                Ok(done) => settled.push(done),
                Err(Error::InvalidState { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(settled)
    }

    // ─────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────

    pub fn get(&self, id: &DealId) -> Result<Deal> {
        let entry = self.entry(id)?;
        let guard = entry.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.deal.clone())
    }

    /// Ordered event history of one deal, oldest first.
    pub fn events(&self, id: &DealId) -> Result<Vec<DealEvent>> {
        let entry = self.entry(id)?;
        let guard = entry.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.events.clone())
    }

    /// Every deal, oldest first.
    pub fn list(&self) -> Vec<Deal> {
        self.snapshot()
    }

    /// Deals on which `address` is the client or the freelancer, oldest first.
    pub fn list_for_party(&self, address: &str) -> Vec<Deal> {
        self.snapshot()
            .into_iter()
            .filter(|deal| roles::derive_role(deal, address).is_party())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
