//! Axum server setup, shared application state, and graceful shutdown.
//!
//! Contains [`AppState`] (the `Arc`-shared state holding the reverse
//! proxy pipeline and uptime), [`Stats`] (per-outcome request counters),
//! [`build_router`] for constructing the Axum router with middleware
//! layers, and [`shutdown_signal`] for SIGTERM / Ctrl+C handling.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::health::health_handler;
use crate::proxy::{self, ReverseProxy};

#[derive(Debug)]
pub struct Stats {
    pub forwarded: AtomicU64,
    pub unauthorized: AtomicU64,
    pub failed: AtomicU64,
    pub relay_errors: AtomicU64,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            forwarded: AtomicU64::new(0),
            unauthorized: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            relay_errors: AtomicU64::new(0),
        }
    }
}

pub struct AppState {
    pub proxy: ReverseProxy,
    pub health_path: String,
    pub start_time: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(proxy: ReverseProxy, health_path: impl Into<String>) -> Self {
        Self {
            proxy,
            health_path: health_path.into(),
            start_time: Instant::now(),
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let health_path = state.health_path.clone();
    Router::new()
        .route(
            &health_path,
            get(health_handler).fallback(proxy::proxy_handler),
        )
        .fallback(proxy::proxy_handler)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
