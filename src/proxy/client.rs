//! Upstream HTTP client seam.
//!
//! [`UpstreamClient`] is the one operation the forwarder needs from a
//! network client: send a request, get a streaming response back.
//! [`ClientFactory`] builds that client on first use. The default
//! [`HyperClientFactory`] produces a connection-pooled hyper client with
//! rustls for `https` destinations.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::auth::BoxError;

pub type HttpsConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;
pub type HttpClient = Client<HttpsConnector, Body>;

/// Issues outbound requests. Shared read-only across concurrent requests.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn send(&self, request: Request<Body>) -> Result<Response<Body>, BoxError>;
}

#[async_trait]
impl UpstreamClient for HttpClient {
    async fn send(&self, request: Request<Body>) -> Result<Response<Body>, BoxError> {
        let response = self.request(request).await?;
        Ok(response.map(Body::new))
    }
}

/// Creates the client a forwarder reuses for its whole lifetime.
pub trait ClientFactory: Send + Sync {
    type Client: UpstreamClient;

    fn build(&self) -> Self::Client;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HyperClientFactory;

impl ClientFactory for HyperClientFactory {
    type Client = HttpClient;

    fn build(&self) -> HttpClient {
        build_http_client()
    }
}

#[must_use]
pub fn build_http_client() -> HttpClient {
    // When multiple rustls crypto providers are compiled in, rustls cannot
    // auto-detect which one to use. Explicitly install `ring`.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .build();
    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(30))
        .build(https)
}
