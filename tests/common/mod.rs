//! Shared harness: a stub upstream that echoes what it received, and a
//! proxy instance pointed at it.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use authproxy::auth::TokenAuthenticator;
use authproxy::config::model::{AuthConfig, TokenEntry, DEFAULT_HEALTH_PATH};
use authproxy::proxy::forwarder::HttpForwarder;
use authproxy::proxy::ReverseProxy;
use authproxy::server::{self, AppState};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Method, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde::Deserialize;

pub const TOKEN: &str = "test";
pub const LARGE_BODY_LEN: usize = 2 * 1024 * 1024;

/// What the stub upstream saw, as returned in its JSON body.
#[derive(Debug, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: String,
}

impl Echo {
    pub fn header(&self, name: &str) -> Vec<&str> {
        self.headers
            .get(name)
            .map(|values| values.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

pub struct Harness {
    pub proxy_addr: SocketAddr,
    pub upstream_addr: SocketAddr,
    pub upstream_hits: Arc<AtomicUsize>,
    shutdown: Vec<tokio::sync::oneshot::Sender<()>>,
}

impl Harness {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.proxy_addr)
    }

    pub fn hits(&self) -> usize {
        self.upstream_hits.load(Ordering::SeqCst)
    }

    pub fn shutdown(self) {
        for tx in self.shutdown {
            let _ = tx.send(());
        }
    }
}

async fn echo(
    State(hits): State<Arc<AtomicUsize>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    hits.fetch_add(1, Ordering::SeqCst);

    if uri.path().ends_with("/large") {
        return vec![b'x'; LARGE_BODY_LEN].into_response();
    }

    let mut seen: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in &headers {
        seen.entry(name.to_string())
            .or_default()
            .push(value.to_str().unwrap_or_default().to_string());
    }

    let mut response = Json(serde_json::json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "headers": seen,
        "body": String::from_utf8_lossy(&body),
    }))
    .into_response();

    if uri.path().ends_with("/override") {
        response
            .headers_mut()
            .insert("x-correlation-id", HeaderValue::from_static("from-upstream"));
    }
    response
}

async fn serve(router: Router, listener: tokio::net::TcpListener) -> tokio::sync::oneshot::Sender<()> {
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });
    tx
}

pub fn authenticator() -> TokenAuthenticator {
    let mut claims = BTreeMap::new();
    claims.insert("user".to_string(), "test".to_string());
    claims.insert("id".to_string(), "1".to_string());
    TokenAuthenticator::from_config(&AuthConfig {
        tokens: vec![TokenEntry {
            token: Some(TOKEN.into()),
            token_sha256: None,
            claims,
        }],
    })
}

/// Start a proxy in front of `base_url`.
pub async fn start_proxy(base_url: String) -> (SocketAddr, tokio::sync::oneshot::Sender<()>) {
    let proxy = ReverseProxy::builder()
        .authenticator(authenticator())
        .forwarder(HttpForwarder::new(base_url))
        .build()
        .unwrap();
    let state = Arc::new(AppState::new(proxy, DEFAULT_HEALTH_PATH));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (addr, serve(server::build_router(state), listener).await)
}

/// Start the echo upstream and a proxy forwarding to `<upstream>/api`.
pub async fn start() -> Harness {
    let hits = Arc::new(AtomicUsize::new(0));
    let upstream = Router::new().fallback(echo).with_state(Arc::clone(&hits));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream_addr = listener.local_addr().unwrap();
    let upstream_tx = serve(upstream, listener).await;

    let (proxy_addr, proxy_tx) = start_proxy(format!("http://{upstream_addr}/api")).await;

    Harness {
        proxy_addr,
        upstream_addr,
        upstream_hits: hits,
        shutdown: vec![proxy_tx, upstream_tx],
    }
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
