// Ticket Market Ledger - server entry point
//
// Callers are trusted: the `caller` field of a request is taken as given.
// Keep the listener on loopback unless a proxy authenticates in front of it.

use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use ticket_market_ledger::app_state::{AppState, SharedState};
use ticket_market_ledger::config::Config;
use ticket_market_ledger::routes::router;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {}", err);
            return ExitCode::FAILURE;
        }
    };

    // Already validated by `Config::from_env`
    fmt().with_env_filter(EnvFilter::new(&config.log_filter)).init();

    let state: SharedState = match AppState::from_config(config) {
        Ok(state) => Arc::new(state),
        Err(err) => {
            error!("startup failed: {}", err);
            return ExitCode::FAILURE;
        }
    };
    let bind_addr = state.config.bind_addr;

    let listener = match tokio::net::TcpListener::bind(bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(%bind_addr, "failed to bind: {}", err);
            return ExitCode::FAILURE;
        }
    };

    info!(
        %bind_addr,
        admin = %state.config.admin,
        custody = %state.config.custody,
        "ticket market ledger listening"
    );

    let shutdown_state = state.clone();
    let app = router(state);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    info!("shutting down, saving snapshot");
    let saved = shutdown_state.save_to_disk();

    match (served, saved) {
        (Ok(()), Ok(())) => ExitCode::SUCCESS,
        (Err(err), _) => {
            error!("server error: {}", err);
            ExitCode::FAILURE
        }
        (_, Err(err)) => {
            error!("failed to save snapshot: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {}", err);
        std::future::pending::<()>().await;
    }
}
