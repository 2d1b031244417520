use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::invariants::{
    assert_all_deal_invariants, assert_immutable_fields, assert_valid_status_transition,
};
use crate::validation::{FIELD_AMOUNT, FIELD_DEADLINE, FIELD_FREELANCER, FIELD_TITLE};
use crate::{
    Action, Amount, Currency, Deal, DealDraft, DealId, DealLifecycle, DealStatus, Error,
    EventKind, Role,
};

const CLIENT: &str = "C1";
const FREELANCER: &str = "F1";
const STRANGER: &str = "rStranger";

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap()
}

fn website_draft() -> DealDraft {
    DealDraft {
        title: "Website".to_string(),
        amount: "500".to_string(),
        currency: "XRP".to_string(),
        freelancer_address: FREELANCER.to_string(),
        deadline: "7".to_string(),
        description: "Landing page and blog".to_string(),
    }
}

fn new_deal() -> Deal {
    let id = DealId::new(t0(), 0);
    let (deal, _) = DealLifecycle::create(id, &website_draft(), CLIENT, t0()).unwrap();
    deal
}

fn signed_deal() -> Deal {
    let mut deal = new_deal();
    DealLifecycle::sign(&mut deal, CLIENT, t0()).unwrap();
    DealLifecycle::sign(&mut deal, FREELANCER, t0()).unwrap();
    deal
}

fn funded_deal() -> Deal {
    let mut deal = signed_deal();
    DealLifecycle::fund(&mut deal, CLIENT, t0()).unwrap();
    deal
}

// ─────────────────────────────────────────────────────────
// create
// ─────────────────────────────────────────────────────────

#[test]
fn test_create_starts_pending_and_unsigned() {
    let deal = new_deal();

    assert_eq!(deal.status, DealStatus::Pending);
    assert!(!deal.signatures.client);
    assert!(!deal.signatures.freelancer);
    assert_eq!(deal.amount, Amount::from_drops(500_000_000));
    assert_eq!(deal.currency, Currency::Xrp);
    assert_eq!(deal.client_address, CLIENT);
    assert_eq!(deal.freelancer_address, FREELANCER);
    assert_eq!(deal.finish_after, t0() + Duration::days(7));
    assert!(deal.escrow_reference.is_none());
    assert_all_deal_invariants(&deal);
}

#[test]
fn test_create_emits_created_event() {
    let id = DealId::new(t0(), 3);
    let (deal, event) = DealLifecycle::create(id, &website_draft(), CLIENT, t0()).unwrap();

    assert_eq!(deal.id.as_str(), format!("DEAL-{}-3", t0().timestamp_millis()));
    assert_eq!(event.kind, EventKind::DealCreated);
    assert_eq!(event.deal_id, deal.id);
    assert_eq!(event.actor.as_deref(), Some(CLIENT));
    assert_eq!(event.role, Some(Role::Client));
    assert_eq!(event.status, DealStatus::Pending);
}

#[test]
fn test_create_rejects_each_invalid_field() {
    let cases: [(fn(&mut DealDraft), &str); 4] = [
        (|d: &mut DealDraft| d.title = "  ".to_string(), FIELD_TITLE),
        (|d: &mut DealDraft| d.amount = "0".to_string(), FIELD_AMOUNT),
        (|d: &mut DealDraft| d.freelancer_address = String::new(), FIELD_FREELANCER),
        (|d: &mut DealDraft| d.deadline = "0".to_string(), FIELD_DEADLINE),
    ];

    for (mutate, field) in cases {
        let mut draft = website_draft();
        mutate(&mut draft);
        let err = DealLifecycle::create(DealId::new(t0(), 0), &draft, CLIENT, t0()).unwrap_err();
        match err {
            Error::Validation(errors) => {
                assert_eq!(errors.len(), 1, "expected only {field} to fail");
                assert!(errors.contains(field), "expected {field} to fail");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}

// ─────────────────────────────────────────────────────────
// sign
// ─────────────────────────────────────────────────────────

#[test]
fn test_first_signature_keeps_pending() {
    let mut deal = new_deal();
    let event = DealLifecycle::sign(&mut deal, CLIENT, t0()).unwrap();

    assert!(deal.signatures.client);
    assert!(!deal.signatures.freelancer);
    assert_eq!(deal.status, DealStatus::Pending);
    assert_eq!(event.kind, EventKind::DealSigned);
    assert_eq!(event.role, Some(Role::Client));
}

#[test]
fn test_signing_order_does_not_matter() {
    let mut a = new_deal();
    DealLifecycle::sign(&mut a, CLIENT, t0()).unwrap();
    DealLifecycle::sign(&mut a, FREELANCER, t0()).unwrap();

    let mut b = new_deal();
    DealLifecycle::sign(&mut b, FREELANCER, t0()).unwrap();
    let last = DealLifecycle::sign(&mut b, CLIENT, t0()).unwrap();

    assert_eq!(a, b);
    assert_eq!(a.status, DealStatus::Signed);
    assert_eq!(last.kind, EventKind::DealFullySigned);
    assert_all_deal_invariants(&a);
}

#[test]
fn test_double_sign_is_rejected_without_effect() {
    let mut deal = new_deal();
    DealLifecycle::sign(&mut deal, CLIENT, t0()).unwrap();
    let before = deal.clone();

    let err = DealLifecycle::sign(&mut deal, CLIENT, t0()).unwrap_err();
    assert_eq!(
        err,
        Error::AlreadySigned {
            deal_id: deal.id.clone(),
            role: Role::Client,
        }
    );
    assert_eq!(deal, before);

    DealLifecycle::sign(&mut deal, FREELANCER, t0()).unwrap();
    let signed = deal.clone();
    assert!(DealLifecycle::sign(&mut deal, FREELANCER, t0()).is_err());
    assert!(DealLifecycle::sign(&mut deal, CLIENT, t0()).is_err());
    assert_eq!(deal, signed);
    assert_eq!(deal.status, DealStatus::Signed);
}

#[test]
fn test_observer_cannot_sign() {
    let mut deal = new_deal();
    let err = DealLifecycle::sign(&mut deal, STRANGER, t0()).unwrap_err();
    assert!(matches!(err, Error::Unauthorized { action: Action::Sign, .. }));
    assert!(!deal.signatures.client && !deal.signatures.freelancer);
}

#[test]
fn test_sign_after_cancel_is_invalid_state() {
    let mut deal = new_deal();
    DealLifecycle::cancel(&mut deal, FREELANCER, t0()).unwrap();
    let err = DealLifecycle::sign(&mut deal, CLIENT, t0()).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidState {
            status: DealStatus::Cancelled,
            ..
        }
    ));
}

// ─────────────────────────────────────────────────────────
// fund
// ─────────────────────────────────────────────────────────

#[test]
fn test_fund_assigns_escrow_reference() {
    let mut deal = signed_deal();
    let original = deal.clone();
    let funded_at = t0() + Duration::hours(1);

    let event = DealLifecycle::fund(&mut deal, CLIENT, funded_at).unwrap();

    assert_eq!(deal.status, DealStatus::Funded);
    assert_eq!(deal.funded_at, Some(funded_at));
    let reference = deal.escrow_reference.as_ref().unwrap();
    assert_eq!(reference.as_str().len(), 64);
    assert!(reference.as_str().bytes().all(|b| b.is_ascii_hexdigit()));
    assert_eq!(event.kind, EventKind::EscrowFunded);
    assert_valid_status_transition(original.status, deal.status);
    assert_immutable_fields(&original, &deal);
    assert_all_deal_invariants(&deal);
}

#[test]
fn test_fund_from_pending_is_invalid_state() {
    let mut deal = new_deal();
    DealLifecycle::sign(&mut deal, CLIENT, t0()).unwrap();

    let err = DealLifecycle::fund(&mut deal, CLIENT, t0()).unwrap_err();
    assert_eq!(
        err,
        Error::InvalidState {
            deal_id: deal.id.clone(),
            action: Action::Fund,
            status: DealStatus::Pending,
        }
    );
    assert!(deal.escrow_reference.is_none());
}

#[test]
fn test_fund_by_freelancer_is_unauthorized() {
    let mut deal = signed_deal();
    let err = DealLifecycle::fund(&mut deal, FREELANCER, t0()).unwrap_err();
    assert_eq!(
        err,
        Error::Unauthorized {
            deal_id: deal.id.clone(),
            caller: FREELANCER.to_string(),
            action: Action::Fund,
        }
    );
    assert_eq!(deal.status, DealStatus::Signed);
}

#[test]
fn test_fund_twice_is_invalid_state() {
    let mut deal = funded_deal();
    let reference = deal.escrow_reference.clone();
    assert!(matches!(
        DealLifecycle::fund(&mut deal, CLIENT, t0()),
        Err(Error::InvalidState { .. })
    ));
    assert_eq!(deal.escrow_reference, reference);
}

#[test]
fn test_fund_exact_checks_terms() {
    let mut deal = signed_deal();

    let err = DealLifecycle::fund_exact(
        &mut deal,
        CLIENT,
        "499.99".parse().unwrap(),
        Currency::Xrp,
        t0(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::TermsMismatch { .. }));

    let amount = deal.amount;
    let err =
        DealLifecycle::fund_exact(&mut deal, CLIENT, amount, Currency::Rlusd, t0()).unwrap_err();
    assert!(matches!(err, Error::TermsMismatch { .. }));
    assert_eq!(deal.status, DealStatus::Signed);

    DealLifecycle::fund_exact(&mut deal, CLIENT, amount, Currency::Xrp, t0()).unwrap();
    assert_eq!(deal.status, DealStatus::Funded);
}

#[test]
fn test_escrow_reference_depends_on_funding_time() {
    let mut a = signed_deal();
    let mut b = signed_deal();
    DealLifecycle::fund(&mut a, CLIENT, t0()).unwrap();
    DealLifecycle::fund(&mut b, CLIENT, t0() + Duration::seconds(1)).unwrap();
    assert_ne!(a.escrow_reference, b.escrow_reference);
}

// ─────────────────────────────────────────────────────────
// complete / cancel
// ─────────────────────────────────────────────────────────

#[test]
fn test_complete_waits_for_deadline() {
    let mut deal = funded_deal();

    let early = t0() + Duration::days(6);
    let err = DealLifecycle::complete(&mut deal, early).unwrap_err();
    assert_eq!(
        err,
        Error::DeadlineNotReached {
            deal_id: deal.id.clone(),
            finish_after: deal.finish_after,
        }
    );
    assert_eq!(deal.status, DealStatus::Funded);

    let finish_after = deal.finish_after;
    let event = DealLifecycle::complete(&mut deal, finish_after).unwrap();
    assert_eq!(deal.status, DealStatus::Completed);
    assert_eq!(event.kind, EventKind::DealCompleted);
    assert!(event.actor.is_none());
    assert!(deal.escrow_reference.is_some());
    assert_all_deal_invariants(&deal);
}

#[test]
fn test_complete_requires_funding() {
    let mut deal = signed_deal();
    let err = DealLifecycle::complete(&mut deal, t0() + Duration::days(30)).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidState {
            action: Action::Complete,
            status: DealStatus::Signed,
            ..
        }
    ));
}

#[test]
fn test_cancel_rules() {
    let mut pending = new_deal();
    assert!(matches!(
        DealLifecycle::cancel(&mut pending, STRANGER, t0()),
        Err(Error::Unauthorized { .. })
    ));
    let event = DealLifecycle::cancel(&mut pending, CLIENT, t0()).unwrap();
    assert_eq!(event.kind, EventKind::DealCancelled);
    assert_eq!(pending.status, DealStatus::Cancelled);
    assert_all_deal_invariants(&pending);

    let mut signed = signed_deal();
    DealLifecycle::cancel(&mut signed, FREELANCER, t0()).unwrap();
    assert_eq!(signed.status, DealStatus::Cancelled);
    assert!(matches!(
        DealLifecycle::cancel(&mut signed, CLIENT, t0()),
        Err(Error::InvalidState { .. })
    ));

    let mut funded = funded_deal();
    assert!(matches!(
        DealLifecycle::cancel(&mut funded, CLIENT, t0()),
        Err(Error::InvalidState { .. })
    ));
}

// ─────────────────────────────────────────────────────────
// queries
// ─────────────────────────────────────────────────────────

#[test]
fn test_derive_role() {
    let deal = new_deal();
    assert_eq!(DealLifecycle::derive_role(&deal, CLIENT), Role::Client);
    assert_eq!(DealLifecycle::derive_role(&deal, " F1 "), Role::Freelancer);
    assert_eq!(DealLifecycle::derive_role(&deal, STRANGER), Role::Observer);
    assert_eq!(DealLifecycle::derive_role(&deal, ""), Role::Observer);
}

#[test]
fn test_available_actions_follow_lifecycle() {
    let mut deal = new_deal();
    assert_eq!(
        DealLifecycle::available_actions(&deal, CLIENT, t0()),
        vec![Action::Sign, Action::Cancel]
    );
    assert!(DealLifecycle::available_actions(&deal, STRANGER, t0()).is_empty());

    DealLifecycle::sign(&mut deal, CLIENT, t0()).unwrap();
    assert_eq!(
        DealLifecycle::available_actions(&deal, CLIENT, t0()),
        vec![Action::Cancel]
    );

    DealLifecycle::sign(&mut deal, FREELANCER, t0()).unwrap();
    assert_eq!(
        DealLifecycle::available_actions(&deal, CLIENT, t0()),
        vec![Action::Fund, Action::Cancel]
    );
    assert_eq!(
        DealLifecycle::available_actions(&deal, FREELANCER, t0()),
        vec![Action::Cancel]
    );

    DealLifecycle::fund(&mut deal, CLIENT, t0()).unwrap();
    assert!(DealLifecycle::available_actions(&deal, CLIENT, t0()).is_empty());
    assert_eq!(
        DealLifecycle::available_actions(&deal, STRANGER, deal.finish_after),
        vec![Action::Complete]
    );
}

// ─────────────────────────────────────────────────────────
// end to end
// ─────────────────────────────────────────────────────────

#[test]
fn test_website_scenario() {
    let mut deal = new_deal();
    assert_eq!(deal.status, DealStatus::Pending);

    let mut previous = deal.status;
    for caller in [CLIENT, FREELANCER] {
        DealLifecycle::sign(&mut deal, caller, t0()).unwrap();
        assert_valid_status_transition(previous, deal.status);
        previous = deal.status;
    }
    assert!(deal.signatures.client && deal.signatures.freelancer);
    assert_eq!(deal.status, DealStatus::Signed);

    let mut other = deal.clone();
    assert!(matches!(
        DealLifecycle::fund(&mut other, FREELANCER, t0()),
        Err(Error::Unauthorized { .. })
    ));

    DealLifecycle::fund(&mut deal, CLIENT, t0()).unwrap();
    assert_eq!(deal.status, DealStatus::Funded);
    assert!(deal.escrow_reference.is_some());
    assert_all_deal_invariants(&deal);
}

#[test]
fn test_deal_json_shape() {
    let deal = funded_deal();
    let json = serde_json::to_value(&deal).unwrap();

    assert_eq!(json["status"], "funded");
    assert_eq!(json["currency"], "XRP");
    assert_eq!(json["amount"], "500");
    assert_eq!(json["signatures"]["client"], true);
    assert_eq!(
        json["escrow_reference"],
        deal.escrow_reference.as_ref().unwrap().as_str()
    );

    let back: Deal = serde_json::from_value(json).unwrap();
    assert_eq!(back, deal);
}

#[test]
fn test_draft_accepts_numeric_form_values() {
    let draft: DealDraft = serde_json::from_value(serde_json::json!({
        "title": "Website",
        "amount": 12.5,
        "freelancerAddress": FREELANCER,
        "deadline": 7
    }))
    .unwrap();
    assert_eq!(draft.amount, "12.5");
    assert_eq!(draft.deadline, "7");
    assert_eq!(draft.currency, "XRP");

    let (deal, _) = DealLifecycle::create(DealId::new(t0(), 0), &draft, CLIENT, t0()).unwrap();
    assert_eq!(deal.amount, "12.5".parse::<Amount>().unwrap());
    assert_eq!(deal.deadline_days, 7);
}

#[test]
fn test_draft_missing_fields_fail_validation() {
    let draft: DealDraft = serde_json::from_value(serde_json::json!({
        "amount": null,
        "deadline": 3
    }))
    .unwrap();
    assert!(draft.title.is_empty());
    assert!(draft.amount.is_empty());

    match DealLifecycle::create(DealId::new(t0(), 0), &draft, CLIENT, t0()) {
        Err(Error::Validation(errors)) => {
            assert!(errors.contains(FIELD_TITLE));
            assert!(errors.contains(FIELD_AMOUNT));
            assert!(errors.contains(FIELD_FREELANCER));
            assert!(!errors.contains(FIELD_DEADLINE));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}
