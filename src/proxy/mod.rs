//! The authenticate → rewrite headers → forward → relay pipeline.
//!
//! [`ReverseProxy`] is built once through [`ReverseProxyBuilder`], which
//! validates the header prefix up front, and is then shared read-only by
//! every request. [`proxy_handler`] is the Axum fallback that hands each
//! non-health request to it. Submodules hold the header transform
//! ([`headers`]), the forwarding capability ([`forwarder`]), and the
//! upstream client seam ([`client`]).

pub mod client;
pub mod forwarder;
pub mod headers;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use http_body_util::BodyExt;

use crate::auth::{AuthError, Authenticator, BoxError};
use crate::error::AuthProxyError;
use crate::server::{AppState, Stats};
use forwarder::{ForwardError, Forwarder};
use headers::{apply_identity_headers, HeaderPrefix};

pub const CORRELATION_ID: HeaderName = HeaderName::from_static("x-correlation-id");

/// How a single request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Unauthorized,
    AuthenticationError,
    ForwardConfigError,
    UpstreamUnreachable,
    Forwarded,
    RelayError,
}

impl Outcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::AuthenticationError => "authentication_error",
            Self::ForwardConfigError => "forward_config_error",
            Self::UpstreamUnreachable => "upstream_unreachable",
            Self::Forwarded => "forwarded",
            Self::RelayError => "relay_error",
        }
    }

    const fn of_forward_error(err: &ForwardError) -> Self {
        match err {
            ForwardError::Upstream(_) => Self::UpstreamUnreachable,
            ForwardError::BaseUrl { .. }
            | ForwardError::BuildRequest(_)
            | ForwardError::Configure(_) => Self::ForwardConfigError,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct ReverseProxy {
    header_prefix: HeaderPrefix,
    authenticator: Arc<dyn Authenticator>,
    forwarder: Arc<dyn Forwarder>,
    stats: Arc<Stats>,
}

#[derive(Default)]
pub struct ReverseProxyBuilder {
    header_prefix: Option<String>,
    authenticator: Option<Arc<dyn Authenticator>>,
    forwarder: Option<Arc<dyn Forwarder>>,
    stats: Option<Arc<Stats>>,
}

impl ReverseProxyBuilder {
    /// Namespace for identity headers. Unset or empty means `Internal-`.
    #[must_use]
    pub fn header_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.header_prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn authenticator(mut self, authenticator: impl Authenticator + 'static) -> Self {
        self.authenticator = Some(Arc::new(authenticator));
        self
    }

    #[must_use]
    pub fn forwarder(mut self, forwarder: impl Forwarder + 'static) -> Self {
        self.forwarder = Some(Arc::new(forwarder));
        self
    }

    #[must_use]
    pub fn stats(mut self, stats: Arc<Stats>) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn build(self) -> Result<ReverseProxy, AuthProxyError> {
        let header_prefix = HeaderPrefix::new(self.header_prefix.as_deref().unwrap_or_default())?;
        let authenticator = self
            .authenticator
            .ok_or(AuthProxyError::MissingComponent("authenticator"))?;
        let forwarder = self
            .forwarder
            .ok_or(AuthProxyError::MissingComponent("forwarder"))?;

        Ok(ReverseProxy {
            header_prefix,
            authenticator,
            forwarder,
            stats: self.stats.unwrap_or_default(),
        })
    }
}

impl ReverseProxy {
    #[must_use]
    pub fn builder() -> ReverseProxyBuilder {
        ReverseProxyBuilder::default()
    }

    #[must_use]
    pub const fn header_prefix(&self) -> &HeaderPrefix {
        &self.header_prefix
    }

    #[must_use]
    pub fn destination(&self) -> &str {
        self.forwarder.destination()
    }

    #[must_use]
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Run one request through the pipeline.
    ///
    /// Every failure before the upstream answers becomes a bare status
    /// response. Once upstream headers are relayed the status is committed;
    /// a later failure while streaming the body can only be logged.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let (mut parts, body) = request.into_parts();

        let correlation_id = parts
            .headers
            .get(&CORRELATION_ID)
            .and_then(|v| v.to_str().ok())
            .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);
        let method = parts.method.clone();
        let path = parts.uri.path().to_string();

        let identity = match self.authenticator.authenticate(&parts).await {
            Ok(identity) => identity,
            Err(AuthError::Unauthorized) => {
                tracing::debug!(
                    correlation_id = %correlation_id,
                    method = %method,
                    path = %path,
                    outcome = %Outcome::Unauthorized,
                    "request rejected"
                );
                self.stats.unauthorized.fetch_add(1, Ordering::Relaxed);
                return status_response(StatusCode::UNAUTHORIZED, &correlation_id);
            }
            Err(e) => {
                tracing::error!(
                    correlation_id = %correlation_id,
                    method = %method,
                    path = %path,
                    outcome = %Outcome::AuthenticationError,
                    error = %e,
                    "authentication failed"
                );
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                return status_response(e.status(), &correlation_id);
            }
        };

        let inbound_headers = std::mem::take(&mut parts.headers);
        let request = Request::from_parts(parts, body);

        let prefix = &self.header_prefix;
        let configure = |outbound: &mut Request<Body>| -> Result<(), BoxError> {
            apply_identity_headers(&inbound_headers, prefix, &identity, outbound.headers_mut())
                .map_err(Into::into)
        };

        let mut response_headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&correlation_id) {
            response_headers.insert(CORRELATION_ID, value);
        }

        match self
            .forwarder
            .forward(request, response_headers, &configure)
            .await
        {
            Ok(response) => {
                tracing::info!(
                    correlation_id = %correlation_id,
                    method = %method,
                    path = %path,
                    status = response.status().as_u16(),
                    claims = identity.len(),
                    outcome = %Outcome::Forwarded,
                    "request forwarded"
                );
                self.stats.forwarded.fetch_add(1, Ordering::Relaxed);
                self.watch_relay(response, correlation_id)
            }
            Err(e) => {
                let outcome = Outcome::of_forward_error(&e);
                tracing::error!(
                    correlation_id = %correlation_id,
                    method = %method,
                    path = %path,
                    outcome = %outcome,
                    error = %e,
                    "could not forward request"
                );
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                status_response(e.status(), &correlation_id)
            }
        }
    }

    /// Log and count errors raised while the upstream body streams out.
    fn watch_relay(&self, response: Response, correlation_id: String) -> Response {
        let stats = Arc::clone(&self.stats);
        response.map(|body| {
            Body::new(body.map_err(move |e| {
                stats.relay_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    correlation_id = %correlation_id,
                    outcome = %Outcome::RelayError,
                    error = %e,
                    "response relay failed"
                );
                e
            }))
        })
    }
}

fn status_response(status: StatusCode, correlation_id: &str) -> Response {
    let mut response = status.into_response();
    if let Ok(value) = HeaderValue::from_str(correlation_id) {
        response.headers_mut().insert(CORRELATION_ID, value);
    }
    response
}

pub async fn proxy_handler(State(state): State<Arc<AppState>>, request: Request<Body>) -> Response {
    state.proxy.handle(request).await
}
