// HTTP request handlers for the settlement ledger API

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::debug;

use crate::access::Role;
use crate::app_state::{AppState, SharedState};
use crate::error::LedgerError;
use crate::ledger::{Ledger, TicketView};
use crate::market_resolve::MarketOption;
use crate::models::*;
use crate::orderbook::{Fill, OrderBookSnapshot};
use crate::{MarketId, OptionId, TicketId};

const DEFAULT_ACTIVITY_LIMIT: usize = 100;

// ===== ERRORS =====

/// Error body: `{ "success": false, "error": <kind>, "message": <text> }`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn self_purchase(ticket_id: TicketId, caller: &str) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            kind: "SelfPurchase",
            message: format!("{} already owns ticket {}", caller, ticket_id),
        }
    }
}

pub fn status_for(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::Unauthorized { .. }
        | LedgerError::CustodyCaller(_)
        | LedgerError::NotOwner { .. } => StatusCode::FORBIDDEN,

        LedgerError::MarketNotFound(_)
        | LedgerError::TicketNotFound(_)
        | LedgerError::NoListing(_)
        | LedgerError::NoListings { .. } => StatusCode::NOT_FOUND,

        LedgerError::MarketClosed(_)
        | LedgerError::AlreadyResolved(_)
        | LedgerError::MarketNotResolved(_)
        | LedgerError::DuplicateListing(_)
        | LedgerError::NotWinningOption { .. }
        | LedgerError::AlreadyClaimed(_)
        | LedgerError::AlreadySwept(_)
        | LedgerError::LastAdmin(_) => StatusCode::CONFLICT,

        LedgerError::OptionOutOfRange { .. }
        | LedgerError::ZeroPrice
        | LedgerError::InvalidSchedule(_)
        | LedgerError::Overflow(_) => StatusCode::BAD_REQUEST,

        LedgerError::InsufficientFunds { .. } | LedgerError::InsufficientAllowance { .. } => {
            StatusCode::PAYMENT_REQUIRED
        }

        LedgerError::CollaboratorFailure(_) => StatusCode::BAD_GATEWAY,
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self {
            status: status_for(&err),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "error": self.kind,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Run a write under the exclusive lock, or on a scratch copy when simulating.
fn execute<Out, F>(state: &AppState, simulate: bool, op: F) -> ApiResult<Out>
where
    F: FnOnce(&mut Ledger) -> Result<Out, ApiError>,
{
    let out = if simulate {
        state.ledger.read().simulate(op)?
    } else {
        op(&mut state.ledger.write())?
    };
    Ok(Json(ApiResponse::write(out, simulate)))
}

fn read<Out, F>(state: &AppState, op: F) -> ApiResult<Out>
where
    F: FnOnce(&Ledger) -> Result<Out, LedgerError>,
{
    let out = op(&state.ledger.read())?;
    Ok(Json(ApiResponse::ok(out)))
}

// ===== HEALTH & ACTIVITY =====

pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    let ledger = state.ledger.read();
    Json(HealthResponse {
        status: "ok",
        markets: ledger.market_count(),
        tickets: ledger.ticket_count(),
        listings: ledger.listings().len(),
    })
}

pub async fn get_activity(
    State(state): State<SharedState>,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<Vec<crate::activity::LedgerEvent>> {
    let limit = query.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    read(&state, |ledger| Ok(ledger.activity(limit)))
}

// ===== MARKETS =====

pub async fn get_markets(State(state): State<SharedState>) -> ApiResult<Vec<MarketResponse>> {
    let decimals = state.config.token_decimals;
    read(&state, |ledger| {
        Ok(ledger
            .market_views()
            .into_iter()
            .map(|view| MarketResponse::new(view, decimals))
            .collect())
    })
}

pub async fn create_market(
    State(state): State<SharedState>,
    Query(query): Query<SimulateQuery>,
    Json(payload): Json<CreateMarketRequest>,
) -> ApiResult<CreatedMarket> {
    let (caller, market) = payload.into_parts();
    debug!(%caller, title = %market.title, simulate = query.simulate, "POST /markets");
    execute(&state, query.simulate, |ledger| {
        let market_id = ledger.create_market(&caller, market)?;
        Ok(CreatedMarket { market_id })
    })
}

pub async fn get_market(
    State(state): State<SharedState>,
    Path(market_id): Path<MarketId>,
) -> ApiResult<MarketResponse> {
    let decimals = state.config.token_decimals;
    read(&state, |ledger| {
        ledger
            .market_view(market_id)
            .map(|view| MarketResponse::new(view, decimals))
    })
}

pub async fn get_options(
    State(state): State<SharedState>,
    Path(market_id): Path<MarketId>,
) -> ApiResult<Vec<MarketOption>> {
    read(&state, |ledger| ledger.options(market_id).map(|options| options.to_vec()))
}

pub async fn resolve_market(
    State(state): State<SharedState>,
    Path(market_id): Path<MarketId>,
    Query(query): Query<SimulateQuery>,
    Json(payload): Json<ResolveRequest>,
) -> ApiResult<MarketResponse> {
    let decimals = state.config.token_decimals;
    execute(&state, query.simulate, |ledger| {
        ledger.resolve_market(&payload.caller, market_id, payload.winning_option)?;
        let view = ledger.market_view(market_id)?;
        Ok(MarketResponse::new(view, decimals))
    })
}

pub async fn sweep_residual(
    State(state): State<SharedState>,
    Path(market_id): Path<MarketId>,
    Query(query): Query<SimulateQuery>,
    Json(payload): Json<SweepRequest>,
) -> ApiResult<SweepResponse> {
    let recipient = payload.recipient.unwrap_or_else(|| payload.caller.clone());
    let state_ref = &state;
    execute(state_ref, query.simulate, |ledger| {
        let amount = ledger.sweep_residual(&payload.caller, market_id, &recipient)?;
        Ok(SweepResponse {
            market_id,
            amount_human: state_ref.human(amount),
            recipient: recipient.clone(),
            amount,
        })
    })
}

// ===== PRIMARY ISSUANCE =====

pub async fn issue_ticket(
    State(state): State<SharedState>,
    Path((market_id, option_id)): Path<(MarketId, OptionId)>,
    Query(query): Query<SimulateQuery>,
    Json(payload): Json<CallerRequest>,
) -> ApiResult<IssuedTicket> {
    let state_ref = &state;
    execute(state_ref, query.simulate, |ledger| {
        let ticket_id = ledger.issue_ticket(&payload.caller, market_id, option_id)?;
        let price = ledger.ticket(ticket_id)?.ticket.price_paid;
        Ok(IssuedTicket {
            ticket_id,
            market_id,
            option_id,
            price,
            price_human: state_ref.human(price),
        })
    })
}

// ===== ORDER BOOK =====

pub async fn get_order_book(
    State(state): State<SharedState>,
    Path((market_id, option_id)): Path<(MarketId, OptionId)>,
) -> ApiResult<OrderBookSnapshot> {
    read(&state, |ledger| ledger.order_book(market_id, option_id))
}

pub async fn buy_at_best_price(
    State(state): State<SharedState>,
    Path((market_id, option_id)): Path<(MarketId, OptionId)>,
    Query(query): Query<SimulateQuery>,
    Json(payload): Json<CallerRequest>,
) -> ApiResult<FillResponse> {
    let state_ref = &state;
    execute(state_ref, query.simulate, |ledger| {
        let best = ledger.best_listing(market_id, option_id)?;
        if best.seller == payload.caller {
            return Err(ApiError::self_purchase(best.ticket_id, &payload.caller));
        }
        let fill = ledger.buy_at_best_price(&payload.caller, market_id, option_id)?;
        Ok(fill_response(state_ref, fill))
    })
}

pub async fn get_all_listings(State(state): State<SharedState>) -> ApiResult<ListingList> {
    read(&state, |ledger| Ok(ledger.listings()))
}

// ===== TICKETS =====

pub async fn get_ticket(
    State(state): State<SharedState>,
    Path(ticket_id): Path<TicketId>,
) -> ApiResult<TicketView> {
    read(&state, |ledger| ledger.ticket(ticket_id))
}

pub async fn list_ticket(
    State(state): State<SharedState>,
    Path(ticket_id): Path<TicketId>,
    Query(query): Query<SimulateQuery>,
    Json(payload): Json<ListRequest>,
) -> ApiResult<crate::orderbook::Listing> {
    execute(&state, query.simulate, |ledger| {
        Ok(ledger.list_ticket(&payload.caller, ticket_id, payload.ask_price.0)?)
    })
}

pub async fn cancel_listing(
    State(state): State<SharedState>,
    Path(ticket_id): Path<TicketId>,
    Query(query): Query<SimulateQuery>,
    Json(payload): Json<CallerRequest>,
) -> ApiResult<crate::orderbook::Listing> {
    execute(&state, query.simulate, |ledger| {
        Ok(ledger.cancel_listing(&payload.caller, ticket_id)?)
    })
}

pub async fn buy_ticket(
    State(state): State<SharedState>,
    Path(ticket_id): Path<TicketId>,
    Query(query): Query<SimulateQuery>,
    Json(payload): Json<CallerRequest>,
) -> ApiResult<FillResponse> {
    let state_ref = &state;
    execute(state_ref, query.simulate, |ledger| {
        if ledger.listing(ticket_id)?.seller == payload.caller {
            return Err(ApiError::self_purchase(ticket_id, &payload.caller));
        }
        let fill = ledger.buy_listed(&payload.caller, ticket_id)?;
        Ok(fill_response(state_ref, fill))
    })
}

pub async fn claim_payout(
    State(state): State<SharedState>,
    Path(ticket_id): Path<TicketId>,
    Query(query): Query<SimulateQuery>,
    Json(payload): Json<CallerRequest>,
) -> ApiResult<ClaimResponse> {
    let state_ref = &state;
    execute(state_ref, query.simulate, |ledger| {
        let amount = ledger.claim_payout(&payload.caller, ticket_id)?;
        Ok(ClaimResponse {
            ticket_id,
            amount,
            amount_human: state_ref.human(amount),
        })
    })
}

fn fill_response(state: &AppState, fill: Fill) -> FillResponse {
    FillResponse {
        price_human: state.human(fill.price),
        fill,
    }
}

// ===== ACCOUNTS =====

pub async fn get_account_tickets(
    State(state): State<SharedState>,
    Path(principal): Path<String>,
) -> ApiResult<TicketList> {
    read(&state, |ledger| Ok(ledger.tickets_of(&principal)))
}

pub async fn get_winning_tickets(
    State(state): State<SharedState>,
    Path((principal, market_id)): Path<(String, MarketId)>,
) -> ApiResult<TicketList> {
    read(&state, |ledger| ledger.winning_tickets(market_id, &principal))
}

pub async fn get_balance(
    State(state): State<SharedState>,
    Path(principal): Path<String>,
) -> ApiResult<BalanceResponse> {
    let state_ref = &state;
    read(state_ref, |ledger| {
        let balance = ledger.balance_of(&principal);
        let allowance = ledger.allowance(&principal);
        Ok(BalanceResponse {
            balance_human: state_ref.human(balance),
            allowance_human: state_ref.human(allowance),
            principal: principal.clone(),
            balance,
            allowance,
        })
    })
}

// ===== TOKEN =====

pub async fn approve(
    State(state): State<SharedState>,
    Query(query): Query<SimulateQuery>,
    Json(payload): Json<ApproveRequest>,
) -> ApiResult<BalanceResponse> {
    let state_ref = &state;
    execute(state_ref, query.simulate, |ledger| {
        ledger.approve(&payload.caller, payload.amount.0)?;
        let balance = ledger.balance_of(&payload.caller);
        let allowance = ledger.allowance(&payload.caller);
        Ok(BalanceResponse {
            principal: payload.caller.clone(),
            balance,
            balance_human: state_ref.human(balance),
            allowance,
            allowance_human: state_ref.human(allowance),
        })
    })
}

pub async fn mint_tokens(
    State(state): State<SharedState>,
    Query(query): Query<SimulateQuery>,
    Json(payload): Json<MintRequest>,
) -> ApiResult<BalanceResponse> {
    let state_ref = &state;
    execute(state_ref, query.simulate, |ledger| {
        ledger.mint_tokens(&payload.caller, &payload.to, payload.amount.0)?;
        let balance = ledger.balance_of(&payload.to);
        let allowance = ledger.allowance(&payload.to);
        Ok(BalanceResponse {
            principal: payload.to.clone(),
            balance,
            balance_human: state_ref.human(balance),
            allowance,
            allowance_human: state_ref.human(allowance),
        })
    })
}

// ===== ROLES =====

pub async fn grant_role(
    State(state): State<SharedState>,
    Query(query): Query<SimulateQuery>,
    Json(payload): Json<RoleRequest>,
) -> ApiResult<RoleChange> {
    execute(&state, query.simulate, |ledger| {
        let changed = ledger.grant_role(&payload.caller, payload.role, &payload.principal)?;
        Ok(RoleChange {
            role: payload.role,
            principal: payload.principal.clone(),
            changed,
        })
    })
}

pub async fn revoke_role(
    State(state): State<SharedState>,
    Query(query): Query<SimulateQuery>,
    Json(payload): Json<RoleRequest>,
) -> ApiResult<RoleChange> {
    execute(&state, query.simulate, |ledger| {
        let changed = ledger.revoke_role(&payload.caller, payload.role, &payload.principal)?;
        Ok(RoleChange {
            role: payload.role,
            principal: payload.principal.clone(),
            changed,
        })
    })
}

pub async fn get_role_members(
    State(state): State<SharedState>,
    Path(role): Path<Role>,
) -> ApiResult<RoleMembers> {
    read(&state, |ledger| {
        Ok(RoleMembers {
            role,
            members: ledger.access().members(role),
        })
    })
}
