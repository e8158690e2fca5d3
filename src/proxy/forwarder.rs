//! Forwarding to the fixed upstream destination.
//!
//! [`HttpForwarder`] joins the inbound path and query onto its base URL,
//! lets the caller configure the outbound request (headers), sends it
//! with a lazily-built shared client, and relays the upstream response.
//! The response body is handed back as a stream; nothing is buffered.

use std::sync::OnceLock;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, Uri};
use axum::response::Response;
use url::Url;

use super::client::{ClientFactory, HyperClientFactory, UpstreamClient};
use crate::auth::BoxError;

#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("invalid forward base URL '{url}': {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("could not create request: {0}")]
    BuildRequest(#[source] BoxError),

    #[error("could not configure request: {0}")]
    Configure(#[source] BoxError),

    #[error("could not send request: {0}")]
    Upstream(#[source] BoxError),
}

impl ForwardError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BaseUrl { .. } | Self::BuildRequest(_) | Self::Configure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Callback applied to the outbound request before it is sent.
pub type ConfigureFn<'a> =
    dyn for<'r> Fn(&'r mut Request<Body>) -> Result<(), BoxError> + Send + Sync + 'a;

/// Sends a request to its next destination and relays the answer.
///
/// `response_headers` are the headers the proxy already placed on its own
/// response; upstream headers replace them name by name. `configure` runs
/// on the outbound request before anything touches the network, and its
/// failure aborts the call.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(
        &self,
        request: Request<Body>,
        response_headers: HeaderMap,
        configure: &ConfigureFn<'_>,
    ) -> Result<Response, ForwardError>;

    /// Human-readable destination, for logs and the health endpoint.
    fn destination(&self) -> &str;
}

pub struct HttpForwarder<F: ClientFactory = HyperClientFactory> {
    base_url: String,
    factory: F,
    client: OnceLock<F::Client>,
}

impl HttpForwarder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_factory(base_url, HyperClientFactory)
    }
}

impl<F: ClientFactory> HttpForwarder<F> {
    pub fn with_factory(base_url: impl Into<String>, factory: F) -> Self {
        Self {
            base_url: base_url.into(),
            factory,
            client: OnceLock::new(),
        }
    }

    /// The shared client, built by the first caller. Later calls never lock.
    fn client(&self) -> &F::Client {
        self.client.get_or_init(|| {
            tracing::debug!(destination = %self.base_url, "creating upstream client");
            self.factory.build()
        })
    }
}

impl<F: ClientFactory> std::fmt::Debug for HttpForwarder<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpForwarder")
            .field("base_url", &self.base_url)
            .field("client_ready", &self.client.get().is_some())
            .finish_non_exhaustive()
    }
}

/// Join the inbound path and query onto `base_url`.
///
/// The base path always ends in `/`; the inbound path is appended without
/// its leading `/` unless it is exactly `/`. Path tail and query are
/// copied byte for byte. Dot segments in the base itself are resolved
/// when it is parsed (`/a/b/../` becomes `/a/`).
pub fn forward_url(base_url: &str, inbound: &Uri) -> Result<String, ForwardError> {
    let mut url = Url::parse(base_url).map_err(|source| ForwardError::BaseUrl {
        url: base_url.to_string(),
        source,
    })?;

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);

    let mut joined = String::from(url);
    let path = inbound.path();
    if path != "/" {
        joined.push_str(path.strip_prefix('/').unwrap_or(path));
    }
    if let Some(query) = inbound.query().filter(|q| !q.is_empty()) {
        joined.push('?');
        joined.push_str(query);
    }

    Ok(joined)
}

/// Replace, never merge: every header name the upstream sent loses its
/// existing values on `outgoing` before the upstream values are added.
pub fn replace_headers(outgoing: &mut HeaderMap, upstream: &HeaderMap) {
    for name in upstream.keys() {
        outgoing.remove(name);
        for value in upstream.get_all(name) {
            outgoing.append(name.clone(), value.clone());
        }
    }
}

#[async_trait]
impl<F: ClientFactory> Forwarder for HttpForwarder<F> {
    async fn forward(
        &self,
        request: Request<Body>,
        response_headers: HeaderMap,
        configure: &ConfigureFn<'_>,
    ) -> Result<Response, ForwardError> {
        let url = forward_url(&self.base_url, request.uri())?;

        let (parts, body) = request.into_parts();
        let mut outbound = Request::builder()
            .method(parts.method)
            .uri(url)
            .body(body)
            .map_err(|e| ForwardError::BuildRequest(Box::new(e)))?;

        configure(&mut outbound).map_err(ForwardError::Configure)?;

        let upstream = self
            .client()
            .send(outbound)
            .await
            .map_err(ForwardError::Upstream)?;

        let (upstream_parts, upstream_body) = upstream.into_parts();
        let mut headers = response_headers;
        replace_headers(&mut headers, &upstream_parts.headers);

        let mut response = Response::new(upstream_body);
        *response.status_mut() = upstream_parts.status;
        *response.headers_mut() = headers;
        Ok(response)
    }

    fn destination(&self) -> &str {
        &self.base_url
    }
}
