//! HTTP surface for the hosting application.
//!
//! Serves the balance-lookup API the dashboard consumes: current values,
//! detailed state, forced refresh, and read access to the durable history.
//! CORS is open for local development, matching how the host's dev server
//! talks to it.

pub mod routes;

use anyhow::{Context as _, Result};
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::monitor::WalletMonitor;

/// Bind the API port and serve in a background task — doesn't block.
pub async fn spawn_server(monitor: WalletMonitor, port: u16) -> Result<()> {
    let app = build_router(monitor);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind API port {port}"))?;
    info!(port, "API server listening on http://localhost:{port}");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "API server error");
        }
    });

    Ok(())
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(monitor: WalletMonitor) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/balances", get(routes::get_balances))
        .route("/api/balances/detailed", get(routes::get_detailed_balances))
        .route("/api/refresh", post(routes::force_refresh))
        .route("/api/history", get(routes::get_all_history))
        .route("/api/history/:wallet", get(routes::get_wallet_history))
        .route("/api/stats/:wallet", get(routes::get_wallet_stats))
        .route("/health", get(routes::health))
        .layer(cors)
        .with_state(monitor)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
