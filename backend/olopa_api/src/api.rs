//! Axum REST API handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use olopa_deal::{
    Action, Amount, Currency, Deal, DealBook, DealDraft, DealEvent, DealId, DealLifecycle, Role,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::{ApiError, Result};

/// Source of the current time, injectable for tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Clone)]
pub struct ApiState {
    pub book: Arc<DealBook>,
    pub clock: Clock,
}

impl ApiState {
    pub fn new(book: Arc<DealBook>) -> Self {
        Self {
            book,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

/// All deal routes, without transport layers.
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/deals", get(list_deals).post(create_deal))
        .route("/deals/:id", get(get_deal))
        .route("/deals/:id/events", get(get_deal_events))
        .route("/deals/:id/sign", post(sign_deal))
        .route("/deals/:id/fund", post(fund_deal))
        .route("/deals/:id/complete", post(complete_deal))
        .route("/deals/:id/cancel", post(cancel_deal))
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Request shapes
// ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateDealRequest {
    #[serde(flatten)]
    pub draft: DealDraft,
    #[serde(rename = "clientAddress", default)]
    pub client_address: String,
}

#[derive(Deserialize)]
pub struct CallerRequest {
    pub caller: String,
}

#[derive(Deserialize)]
pub struct FundRequest {
    pub caller: String,
    pub amount: Option<String>,
    pub currency: Option<String>,
}

#[derive(Deserialize)]
pub struct PartyQuery {
    pub party: Option<String>,
}

#[derive(Deserialize)]
pub struct ViewerQuery {
    pub viewer: Option<String>,
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct TransitionResponse {
    pub deal: Deal,
    pub event: DealEvent,
}

#[derive(Serialize)]
pub struct DealView {
    pub deal: Deal,
    pub viewer_role: Option<Role>,
    pub actions: Vec<Action>,
}

#[derive(Serialize)]
pub struct DealsResponse {
    pub count: usize,
    pub deals: Vec<Deal>,
}

#[derive(Serialize)]
pub struct EventsResponse {
    pub deal_id: DealId,
    pub count: usize,
    pub events: Vec<DealEvent>,
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /deals`
///
/// Creates a deal on behalf of `clientAddress`. Field-level validation
/// failures come back as 422 with a `fields` map; a body that is not a JSON
/// object is a 400.
pub async fn create_deal(
    State(state): State<Arc<ApiState>>,
    payload: std::result::Result<Json<CreateDealRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = payload?;
    let (deal, event) = logged(
        "create",
        None,
        state.book.create(&req.draft, &req.client_address, state.now()),
    )?;
    Ok((StatusCode::CREATED, Json(TransitionResponse { deal, event })))
}

/// `GET /deals?party=<address>`
///
/// Lists every deal, or only those where `party` is client or freelancer.
pub async fn list_deals(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<PartyQuery>,
) -> impl IntoResponse {
    let deals = match query.party.as_deref() {
        Some(party) => state.book.list_for_party(party),
        None => state.book.list(),
    };
    Json(DealsResponse {
        count: deals.len(),
        deals,
    })
}

/// `GET /deals/:id?viewer=<address>`
///
/// Returns the deal plus, when a viewer is given, the viewer's derived role
/// and the actions they may take right now.
pub async fn get_deal(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Query(query): Query<ViewerQuery>,
) -> Result<impl IntoResponse> {
    let deal = state.book.get(&DealId::from(id))?;
    let (viewer_role, actions) = match query.viewer.as_deref() {
        Some(viewer) => (
            Some(DealLifecycle::derive_role(&deal, viewer)),
            DealLifecycle::available_actions(&deal, viewer, state.now()),
        ),
        None => (None, Vec::new()),
    };
    Ok(Json(DealView {
        deal,
        viewer_role,
        actions,
    }))
}

/// `GET /deals/:id/events`
pub async fn get_deal_events(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let deal_id = DealId::from(id);
    let events = state.book.events(&deal_id)?;
    Ok(Json(EventsResponse {
        deal_id,
        count: events.len(),
        events,
    }))
}

/// `POST /deals/:id/sign`
pub async fn sign_deal(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<CallerRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = payload?;
    let id = DealId::from(id);
    let (deal, event) = logged(
        "sign",
        Some(&id),
        state.book.sign(&id, &req.caller, state.now()),
    )?;
    Ok(Json(TransitionResponse { deal, event }))
}

/// `POST /deals/:id/fund`
///
/// When `amount` and `currency` are supplied they must match the deal terms.
pub async fn fund_deal(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<FundRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = payload?;
    let id = DealId::from(id);
    let now = state.now();
    let outcome = match (req.amount.as_deref(), req.currency.as_deref()) {
        (None, None) => state.book.fund(&id, &req.caller, now),
        (Some(amount), Some(currency)) => {
            let amount: Amount = amount
                .parse()
                .map_err(|e| ApiError::BadRequest(format!("amount: {e}")))?;
            let currency: Currency = currency
                .parse()
                .map_err(|()| ApiError::BadRequest(format!("unsupported currency {currency:?}")))?;
            state
                .book
                .fund_exact(&id, &req.caller, amount, currency, now)
        }
        _ => {
            return Err(ApiError::BadRequest(
                "amount and currency must be provided together".to_string(),
            ))
        }
    };
    let (deal, event) = logged("fund", Some(&id), outcome)?;
    Ok(Json(TransitionResponse { deal, event }))
}

/// `POST /deals/:id/complete`
///
/// Settles a funded deal whose deadline has passed. The settlement loop does
/// the same on a timer.
pub async fn complete_deal(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id = DealId::from(id);
    let (deal, event) = logged("complete", Some(&id), state.book.complete(&id, state.now()))?;
    Ok(Json(TransitionResponse { deal, event }))
}

/// `POST /deals/:id/cancel`
pub async fn cancel_deal(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<CallerRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = payload?;
    let id = DealId::from(id);
    let (deal, event) = logged(
        "cancel",
        Some(&id),
        state.book.cancel(&id, &req.caller, state.now()),
    )?;
    Ok(Json(TransitionResponse { deal, event }))
}

fn logged(
    op: &str,
    id: Option<&DealId>,
    outcome: olopa_deal::Result<(Deal, DealEvent)>,
) -> Result<(Deal, DealEvent)> {
    match outcome {
        Ok((deal, event)) => {
            info!(
                deal_id = %deal.id,
                event = event.kind.as_str(),
                status = %deal.status,
                "Deal {op} applied"
            );
            Ok((deal, event))
        }
        Err(e) => {
            match id {
                Some(id) => warn!(deal_id = %id, "Deal {op} rejected: {e}"),
                None => warn!("Deal {op} rejected: {e}"),
            }
            Err(e.into())
        }
    }
}
