/// HTTP API tests
///
/// Drives the axum router in-process with `oneshot`; no server is bound.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tokio_test::assert_ok;
use tower::ServiceExt;

use ticket_market_ledger::app_state::{AppState, SharedState};
use ticket_market_ledger::config::Config;
use ticket_market_ledger::ledger::now;
use ticket_market_ledger::routes::router;

// ============================================================================
// TEST ACCOUNTS
// ============================================================================

const ADMIN: &str = "root";
const ALICE: &str = "alice";
const BOB: &str = "bob";

// ============================================================================
// HELPERS
// ============================================================================

fn test_state() -> SharedState {
    let mut config = Config::with_admin(ADMIN);
    config.token_decimals = 2;
    config.admin_funding = 100_000;
    Arc::new(AppState::new(config).unwrap())
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = assert_ok!(to_bytes(response.into_body(), usize::MAX).await);
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    call(app, "POST", uri, Some(body)).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    call(app, "GET", uri, None).await
}

/// Fund and approve ALICE and BOB, then create a two-option market with a 1000 pool.
async fn seeded_app() -> Router {
    let app = router(test_state());
    assert_eq!(post(&app, "/token/approve", json!({ "caller": ADMIN, "amount": 100_000 })).await.0, StatusCode::OK);
    for who in [ALICE, BOB] {
        let (status, _) = post(&app, "/token/mint", json!({ "caller": ADMIN, "to": who, "amount": 1_000 })).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = post(&app, "/token/approve", json!({ "caller": who, "amount": 1_000 })).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = post(
        &app,
        "/markets",
        json!({
            "caller": ADMIN,
            "title": "Will it snow on Sunday?",
            "resolve_at": now() + 3_600,
            "option_labels": ["Yes", "No"],
            "option_prices": [5, 5],
            "prize_pool": 1_000
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["market_id"], 1);
    app
}

// ============================================================================
// TESTS
// ============================================================================

#[tokio::test]
async fn test_health() {
    let app = router(test_state());
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["markets"], 0);
}

#[tokio::test]
async fn test_market_lifecycle_over_http() {
    let app = seeded_app().await;

    let (status, body) = post(&app, "/markets/1/options/0/tickets", json!({ "caller": ALICE })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ticket_id"], 1);
    assert_eq!(body["data"]["price_human"], "0.05");

    let (_, body) = get(&app, "/markets/1").await;
    assert_eq!(body["data"]["status"], "open");
    assert_eq!(body["data"]["total_tickets_sold"], 1);
    assert_eq!(body["data"]["prize_pool_human"], "10");

    let (status, body) = post(&app, "/markets/1/resolve", json!({ "caller": ADMIN, "winning_option": 0 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["payout_per_ticket"], 1_000);

    let (status, body) = post(&app, "/tickets/1/claim", json!({ "caller": ALICE })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["amount"], 1_000);

    let (status, body) = post(&app, "/tickets/1/claim", json!({ "caller": ALICE })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "AlreadyClaimed");

    let (_, body) = get(&app, "/balance/alice").await;
    assert_eq!(body["data"]["balance"], 1_995);
    assert_eq!(body["data"]["balance_human"], "19.95");

    let (_, body) = get(&app, "/accounts/alice/winning/1").await;
    assert_eq!(body["data"][0]["claimed"], true);
}

#[tokio::test]
async fn test_error_status_mapping() {
    let app = seeded_app().await;

    let (status, body) = get(&app, "/markets/9").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "MarketNotFound");

    let (status, body) = post(&app, "/markets/1/resolve", json!({ "caller": BOB, "winning_option": 0 })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Unauthorized");

    let (status, body) = post(&app, "/token/approve", json!({ "caller": "ledger:custody", "amount": 500 })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "CustodyCaller");

    let (status, body) = post(&app, "/markets/1/options/4/tickets", json!({ "caller": BOB })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "OptionOutOfRange");

    let (status, body) = post(&app, "/markets/1/options/0/tickets", json!({ "caller": "nobody" })).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"], "InsufficientAllowance");

    let (status, body) = post(&app, "/markets/1/options/0/buy-best", json!({ "caller": BOB })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoListings");
}

#[tokio::test]
async fn test_simulate_does_not_commit() {
    let app = seeded_app().await;

    let (status, body) = post(&app, "/markets/1/options/1/tickets?simulate=true", json!({ "caller": BOB })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["simulated"], true);
    assert_eq!(body["data"]["ticket_id"], 1);

    let (_, body) = get(&app, "/markets/1/options").await;
    assert_eq!(body["data"][1]["tickets_sold"], 0);
    let (_, body) = get(&app, "/balance/bob").await;
    assert_eq!(body["data"]["balance"], 1_000);

    // Same error taxonomy as a real call
    let (status, body) = post(&app, "/markets/1/sweep?simulate=true", json!({ "caller": ADMIN })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "MarketNotResolved");
}

#[tokio::test]
async fn test_resale_and_order_book() {
    let app = seeded_app().await;
    for _ in 0..2 {
        post(&app, "/markets/1/options/0/tickets", json!({ "caller": ALICE })).await;
    }

    let (status, _) = post(&app, "/tickets/1/list", json!({ "caller": ALICE, "ask_price": 12 })).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post(&app, "/tickets/2/list", json!({ "caller": ALICE, "ask_price": "8" })).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(&app, "/tickets/2/list", json!({ "caller": ALICE, "ask_price": 9 })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "DuplicateListing");

    let (_, body) = get(&app, "/markets/1/options/0/orderbook").await;
    assert_eq!(body["data"]["best_ask"], 8);
    assert_eq!(body["data"]["levels"].as_array().unwrap().len(), 2);

    let (status, body) = post(&app, "/markets/1/options/0/buy-best", json!({ "caller": ALICE })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "SelfPurchase");

    let (status, body) = post(&app, "/markets/1/options/0/buy-best", json!({ "caller": BOB })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ticket_id"], 2);
    assert_eq!(body["data"]["price"], 8);

    let (_, body) = get(&app, "/tickets/2").await;
    assert_eq!(body["data"]["owner"], BOB);
    assert_eq!(body["data"]["listing"], Value::Null);

    let (_, body) = get(&app, "/listings").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["option_label"], "Yes");

    let (status, body) = post(&app, "/tickets/1/cancel", json!({ "caller": BOB })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "NotOwner");

    let (_, body) = get(&app, "/accounts/bob/tickets").await;
    assert_eq!(body["data"][0]["id"], 2);
}

#[tokio::test]
async fn test_roles_and_activity() {
    let app = seeded_app().await;

    let (status, body) = post(&app, "/roles/grant", json!({ "caller": ADMIN, "role": "ADMIN", "principal": ALICE })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["changed"], true);

    let (_, body) = get(&app, "/roles/ADMIN").await;
    assert_eq!(body["data"]["members"], json!([ALICE, ADMIN]));

    let (status, _) = post(&app, "/roles/revoke", json!({ "caller": ALICE, "role": "ADMIN", "principal": ADMIN })).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = post(&app, "/roles/revoke", json!({ "caller": ALICE, "role": "ADMIN", "principal": ALICE })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "LastAdmin");

    let (_, body) = get(&app, "/activity?limit=1").await;
    assert_eq!(body["data"][0]["kind"], "role_revoked");
}
