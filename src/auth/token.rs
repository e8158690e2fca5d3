//! Static bearer-token authenticator driven by the config file.
//!
//! Tokens are kept only as SHA-256 digests. Plain tokens from the config
//! are hashed once at load time, so the table never holds a secret in
//! the clear after startup.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use sha2::{Digest, Sha256};

use super::{AuthError, Authenticator, Identity};
use crate::config::model::AuthConfig;

/// Compute a lowercase hex-encoded SHA-256 digest.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

#[derive(Debug, Default)]
pub struct TokenAuthenticator {
    identities: HashMap<String, Identity>,
}

impl TokenAuthenticator {
    /// Build the digest table from a validated [`AuthConfig`].
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        let identities = config
            .tokens
            .iter()
            .filter_map(|entry| {
                let digest = match (&entry.token, &entry.token_sha256) {
                    (Some(token), _) => sha256_hex(token.as_bytes()),
                    (None, Some(digest)) => digest.to_ascii_lowercase(),
                    (None, None) => return None,
                };
                let identity = entry
                    .claims
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                Some((digest, identity))
            })
            .collect();

        Self { identities }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    fn lookup(&self, token: &str) -> Option<&Identity> {
        self.identities.get(&sha256_hex(token.as_bytes()))
    }
}

/// Extract the presented token: either `Bearer <token>` or the raw value.
fn presented_token(request: &Parts) -> Option<&str> {
    let value = request.headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim_start(),
        _ => value,
    };
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl Authenticator for TokenAuthenticator {
    async fn authenticate(&self, request: &Parts) -> Result<Identity, AuthError> {
        let token = presented_token(request).ok_or(AuthError::Unauthorized)?;
        self.lookup(token).cloned().ok_or(AuthError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use axum::http::Request;

    use super::*;
    use crate::config::model::TokenEntry;

    fn authenticator() -> TokenAuthenticator {
        let mut claims = BTreeMap::new();
        claims.insert("user".to_string(), "test".to_string());
        claims.insert("id".to_string(), "1".to_string());

        let mut service_claims = BTreeMap::new();
        service_claims.insert("service".to_string(), "billing".to_string());

        TokenAuthenticator::from_config(&AuthConfig {
            tokens: vec![
                TokenEntry {
                    token: Some("test".into()),
                    token_sha256: None,
                    claims,
                },
                TokenEntry {
                    token: None,
                    token_sha256: Some(sha256_hex(b"s3cret").to_uppercase()),
                    claims: service_claims,
                },
            ],
        })
    }

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/anything");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn sha256_hex_is_lowercase_hex() {
        assert_eq!(
            sha256_hex(b"test"),
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[tokio::test]
    async fn raw_token_yields_claims() {
        let identity = authenticator()
            .authenticate(&parts(Some("test")))
            .await
            .unwrap();
        assert_eq!(identity.get("user"), Some("test"));
        assert_eq!(identity.get("id"), Some("1"));
    }

    #[tokio::test]
    async fn bearer_scheme_is_accepted() {
        let identity = authenticator()
            .authenticate(&parts(Some("bearer s3cret")))
            .await
            .unwrap();
        assert_eq!(identity.get("service"), Some("billing"));
    }

    #[tokio::test]
    async fn bearer_scheme_tolerates_case_and_spacing() {
        let identity = authenticator()
            .authenticate(&parts(Some("BEARER   test")))
            .await
            .unwrap();
        assert_eq!(identity.get("user"), Some("test"));

        let result = authenticator().authenticate(&parts(Some("Bearertest"))).await;
        assert!(matches!(result, Err(AuthError::Unauthorized)));
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let result = authenticator().authenticate(&parts(None)).await;
        assert!(matches!(result, Err(AuthError::Unauthorized)));
    }

    #[tokio::test]
    async fn unknown_token_is_unauthorized() {
        let result = authenticator()
            .authenticate(&parts(Some("Bearer nope")))
            .await;
        assert!(matches!(result, Err(AuthError::Unauthorized)));
    }

    #[tokio::test]
    async fn empty_bearer_is_unauthorized() {
        let result = authenticator().authenticate(&parts(Some("Bearer "))).await;
        assert!(matches!(result, Err(AuthError::Unauthorized)));
    }

    #[test]
    fn table_counts_entries() {
        assert_eq!(authenticator().len(), 2);
        assert!(TokenAuthenticator::default().is_empty());
    }
}
