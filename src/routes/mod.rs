// Routes module - wires every HTTP endpoint to its handler

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::app_state::SharedState;
use crate::handlers::*;

pub fn router(state: SharedState) -> Router {
    Router::new()
        // ===== HEALTH & ACTIVITY =====
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/activity", get(get_activity))

        // ===== MARKETS =====
        .route("/markets", get(get_markets).post(create_market))
        .route("/markets/:id", get(get_market))
        .route("/markets/:id/options", get(get_options))
        .route("/markets/:id/resolve", post(resolve_market))
        .route("/markets/:id/sweep", post(sweep_residual))

        // ===== ISSUANCE & ORDER BOOK =====
        .route("/markets/:id/options/:option/tickets", post(issue_ticket))
        .route("/markets/:id/options/:option/orderbook", get(get_order_book))
        .route("/markets/:id/options/:option/buy-best", post(buy_at_best_price))

        // ===== TICKETS & RESALE =====
        .route("/tickets/:id", get(get_ticket))
        .route("/tickets/:id/list", post(list_ticket))
        .route("/tickets/:id/cancel", post(cancel_listing))
        .route("/tickets/:id/buy", post(buy_ticket))
        .route("/tickets/:id/claim", post(claim_payout))
        .route("/listings", get(get_all_listings))

        // ===== ACCOUNTS =====
        .route("/accounts/:principal/tickets", get(get_account_tickets))
        .route("/accounts/:principal/winning/:market_id", get(get_winning_tickets))
        .route("/balance/:principal", get(get_balance))

        // ===== TOKEN & ROLES =====
        .route("/token/approve", post(approve))
        .route("/token/mint", post(mint_tokens))
        .route("/roles/grant", post(grant_role))
        .route("/roles/revoke", post(revoke_role))
        .route("/roles/:role", get(get_role_members))

        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}
