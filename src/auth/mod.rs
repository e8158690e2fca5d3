//! Caller authentication.
//!
//! An [`Authenticator`] inspects the head of an inbound request and either
//! returns the caller's [`Identity`] (a set of claims that the proxy later
//! surfaces as trusted headers) or an [`AuthError`]. The proxy only cares
//! about the classification: [`AuthError::Unauthorized`] is a client error,
//! anything else is an internal failure.

pub mod token;

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::request::Parts;
use axum::http::StatusCode;

pub use token::TokenAuthenticator;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Claims produced by a successful authentication.
///
/// Keys are unique. An empty identity still means the caller was
/// authenticated; it just carries nothing to inject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    claims: HashMap<String, String>,
}

impl Identity {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, claim: impl Into<String>, value: impl Into<String>) {
        self.claims.insert(claim.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, claim: &str) -> Option<&str> {
        self.claims.get(claim).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.claims.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Identity
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            claims: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Credentials are absent or invalid.
    #[error("unauthorized")]
    Unauthorized,

    #[error("authentication failed: {0}")]
    Internal(#[source] BoxError),
}

impl AuthError {
    pub fn internal(err: impl Into<BoxError>) -> Self {
        Self::Internal(err.into())
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Classifies an inbound request as authenticated or rejected.
///
/// Only the request head is exposed. The body belongs to the forwarder,
/// which streams it upstream untouched.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, request: &Parts) -> Result<Identity, AuthError>;
}

#[async_trait]
impl<F> Authenticator for F
where
    F: Fn(&Parts) -> Result<Identity, AuthError> + Send + Sync,
{
    async fn authenticate(&self, request: &Parts) -> Result<Identity, AuthError> {
        (self)(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_collects_claims() {
        let identity: Identity = [("user", "test"), ("id", "1")].into_iter().collect();
        assert_eq!(identity.len(), 2);
        assert_eq!(identity.get("user"), Some("test"));
        assert_eq!(identity.get("missing"), None);
    }

    #[test]
    fn identity_insert_replaces_existing_claim() {
        let mut identity = Identity::new();
        identity.insert("role", "reader");
        identity.insert("role", "admin");
        assert_eq!(identity.len(), 1);
        assert_eq!(identity.get("role"), Some("admin"));
    }

    #[test]
    fn auth_errors_map_to_statuses() {
        assert_eq!(AuthError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::internal("backend down").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
