//! Serde data structures for the authproxy configuration file.
//!
//! Contains [`Config`] (the root), [`ForwardConfig`], [`AuthConfig`],
//! and [`TokenEntry`]. All types derive `Serialize` and `Deserialize`
//! with `deny_unknown_fields` for strict parsing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::proxy::headers::DEFAULT_HEADER_PREFIX;

pub const DEFAULT_HEALTH_PATH: &str = "/_authproxy/health";

fn default_header_prefix() -> String {
    DEFAULT_HEADER_PREFIX.to_string()
}

fn default_health_path() -> String {
    DEFAULT_HEALTH_PATH.to_string()
}

fn is_default_header_prefix(v: &str) -> bool {
    v == DEFAULT_HEADER_PREFIX
}

fn is_default_health_path(v: &str) -> bool {
    v == DEFAULT_HEALTH_PATH
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub forward: ForwardConfig,

    /// Namespace for trusted identity headers. An empty value falls back
    /// to the default.
    #[serde(
        default = "default_header_prefix",
        skip_serializing_if = "is_default_header_prefix"
    )]
    pub header_prefix: String,

    #[serde(
        default = "default_health_path",
        skip_serializing_if = "is_default_health_path"
    )]
    pub health_path: String,

    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ForwardConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    #[serde(default)]
    pub tokens: Vec<TokenEntry>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TokenEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_sha256: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub claims: BTreeMap<String, String>,
}

impl Config {
    /// The prefix actually in effect: the configured one, or the default
    /// when the config left it empty.
    #[must_use]
    pub fn effective_header_prefix(&self) -> &str {
        if self.header_prefix.is_empty() {
            DEFAULT_HEADER_PREFIX
        } else {
            &self.header_prefix
        }
    }

    #[must_use]
    pub fn total_claims(&self) -> usize {
        self.auth.tokens.iter().map(|t| t.claims.len()).sum()
    }
}
