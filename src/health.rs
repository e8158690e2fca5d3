//! Health endpoint handler.
//!
//! Returns a [`HealthResponse`] JSON payload containing the server
//! version, uptime, forward destination, active header prefix, and
//! cumulative per-outcome request statistics. Served on the configured
//! health path; every other path goes to the proxy.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::server::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub destination: String,
    pub header_prefix: String,
    pub stats: StatsResponse,
}

#[derive(Serialize, Deserialize)]
pub struct StatsResponse {
    pub requests_forwarded: u64,
    pub requests_unauthorized: u64,
    pub requests_failed: u64,
    pub relay_errors: u64,
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let proxy = &state.proxy;
    let stats = proxy.stats();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        destination: proxy.destination().to_string(),
        header_prefix: proxy.header_prefix().to_string(),
        stats: StatsResponse {
            requests_forwarded: stats.forwarded.load(Ordering::Relaxed),
            requests_unauthorized: stats.unauthorized.load(Ordering::Relaxed),
            requests_failed: stats.failed.load(Ordering::Relaxed),
            relay_errors: stats.relay_errors.load(Ordering::Relaxed),
        },
    })
}
