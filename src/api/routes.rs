//! API route handlers.
//!
//! All endpoints return JSON. State is the shared [`WalletMonitor`];
//! handlers only read — the monitor pipeline is the single writer of both
//! the latest-value map and the cache store. The one exception is the
//! refresh endpoint, which drives a full pass through the monitor's own
//! entry point.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::monitor::WalletMonitor;
use crate::types::{CacheEntry, WalletBalance, WalletStats};

/// Default cap for per-wallet history reads.
const WALLET_HISTORY_DEFAULT_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// `GET /api/balances` — wallet name to display string, placeholders
/// included. Cheap: never triggers a scrape.
pub async fn get_balances(
    State(monitor): State<WalletMonitor>,
) -> Json<HashMap<String, String>> {
    Json(monitor.get_balances().await)
}

/// `GET /api/balances/detailed`
pub async fn get_detailed_balances(
    State(monitor): State<WalletMonitor>,
) -> Json<Vec<WalletBalance>> {
    Json(monitor.get_detailed_balances().await)
}

/// `POST /api/refresh` — one synchronous sequential pass; responds after
/// every wallet has resolved.
pub async fn force_refresh(
    State(monitor): State<WalletMonitor>,
) -> Json<Vec<WalletBalance>> {
    Json(monitor.force_refresh_and_wait().await)
}

/// `GET /api/history`
pub async fn get_all_history(
    State(monitor): State<WalletMonitor>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<CacheEntry>> {
    Json(monitor.cache().all_history(query.limit))
}

/// `GET /api/history/{wallet}`
pub async fn get_wallet_history(
    State(monitor): State<WalletMonitor>,
    Path(wallet): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<CacheEntry>> {
    let limit = query.limit.unwrap_or(WALLET_HISTORY_DEFAULT_LIMIT);
    Json(monitor.cache().history(&wallet, limit))
}

/// `GET /api/stats/{wallet}` — 404 until the wallet has at least one
/// valid persisted entry.
pub async fn get_wallet_stats(
    State(monitor): State<WalletMonitor>,
    Path(wallet): Path<String>,
) -> Result<Json<WalletStats>, StatusCode> {
    monitor
        .cache()
        .stats(&wallet)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
