//! Trust-boundary header rewriting.
//!
//! Headers under the [`HeaderPrefix`] namespace are reserved for claims
//! the proxy itself asserts. [`apply_identity_headers`] copies the client's
//! headers onto the outbound request, drops anything the client tried to
//! set inside that namespace, and then writes one header per identity
//! claim.

use axum::http::header::HOST;
use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::auth::Identity;
use crate::error::AuthProxyError;

pub const DEFAULT_HEADER_PREFIX: &str = "Internal-";
pub const PREFIX_SEPARATOR: char = '-';

/// Namespace for injected identity headers, validated at construction.
///
/// Header names are case-insensitive on the wire and `http` stores them
/// lowercased, so matching happens against the lowercased prefix while
/// [`as_str`](Self::as_str) keeps the spelling that was configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPrefix {
    configured: String,
    lowercase: String,
}

impl HeaderPrefix {
    /// Validate `prefix`. An empty string selects [`DEFAULT_HEADER_PREFIX`].
    pub fn new(prefix: &str) -> Result<Self, AuthProxyError> {
        let prefix = if prefix.is_empty() {
            tracing::debug!(
                new_prefix = DEFAULT_HEADER_PREFIX,
                "header prefix was empty, using default"
            );
            DEFAULT_HEADER_PREFIX
        } else {
            prefix
        };

        let invalid = |reason: String| AuthProxyError::InvalidHeaderPrefix {
            prefix: prefix.to_string(),
            reason,
        };

        if !prefix.ends_with(PREFIX_SEPARATOR) {
            return Err(invalid(format!(
                "must end with a '{PREFIX_SEPARATOR}' character"
            )));
        }
        if prefix.parse::<HeaderName>().is_err() {
            return Err(invalid("contains characters not allowed in a header name".into()));
        }

        Ok(Self {
            configured: prefix.to_string(),
            lowercase: prefix.to_ascii_lowercase(),
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.configured
    }

    /// Whether `name` falls inside the reserved namespace.
    #[must_use]
    pub fn matches(&self, name: &HeaderName) -> bool {
        name.as_str().starts_with(&self.lowercase)
    }

    /// Header name carrying `claim`.
    pub fn header_name(&self, claim: &str) -> Result<HeaderName, HeaderTransformError> {
        if claim.is_empty() {
            return Err(HeaderTransformError::InvalidClaimName(claim.to_string()));
        }
        format!("{}{claim}", self.configured)
            .parse()
            .map_err(|_| HeaderTransformError::InvalidClaimName(claim.to_string()))
    }
}

impl Default for HeaderPrefix {
    fn default() -> Self {
        Self {
            configured: DEFAULT_HEADER_PREFIX.to_string(),
            lowercase: DEFAULT_HEADER_PREFIX.to_ascii_lowercase(),
        }
    }
}

impl std::fmt::Display for HeaderPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.configured)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HeaderTransformError {
    #[error("claim '{0}' does not form a valid header name")]
    InvalidClaimName(String),

    #[error("value of claim '{0}' is not a valid header value")]
    InvalidClaimValue(String),
}

/// Build the outbound header set from the inbound one.
///
/// Inbound headers inside the prefix namespace are dropped. Every other
/// header is appended with all of its values, except `Host`, which names
/// the proxy and is derived from the destination instead. Each claim is
/// then inserted with replace semantics, so it ends up with exactly one
/// value however often this runs.
pub fn apply_identity_headers(
    inbound: &HeaderMap,
    prefix: &HeaderPrefix,
    identity: &Identity,
    outbound: &mut HeaderMap,
) -> Result<(), HeaderTransformError> {
    for (name, value) in inbound {
        if prefix.matches(name) || *name == HOST {
            continue;
        }
        outbound.append(name.clone(), value.clone());
    }

    for (claim, value) in identity.iter() {
        let name = prefix.header_name(claim)?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| HeaderTransformError::InvalidClaimValue(claim.to_string()))?;
        outbound.insert(name, value);
    }

    Ok(())
}
