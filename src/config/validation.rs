//! Configuration validation with detailed error reporting.
//!
//! The [`validate`] function checks a parsed [`Config`] for problems
//! that would otherwise surface at request time: an unusable forward
//! destination, a header prefix that cannot act as a namespace, token
//! entries that can never match, and claims that do not form legal
//! header names. Returns every [`ValidationError`] found, not just the
//! first.

use axum::http::HeaderName;
use url::Url;

use super::model::{Config, TokenEntry};
use crate::error::ValidationError;
use crate::proxy::headers::{HeaderPrefix, PREFIX_SEPARATOR};

/// Validate the forward destination. Returns `Ok(())` or a human-readable error.
pub fn validate_base_url(url: &str) -> Result<(), String> {
    match Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            if scheme != "http" && scheme != "https" {
                Err(format!(
                    "unsupported scheme '{scheme}' (expected http or https)"
                ))
            } else if parsed.host_str().is_none() {
                Err(format!("'{url}' has no host"))
            } else {
                Ok(())
            }
        }
        Err(_) => Err(format!("'{url}' is not a valid URL")),
    }
}

/// Validate a header prefix. Returns `Ok(())` or a human-readable error.
pub fn validate_header_prefix(prefix: &str) -> Result<(), String> {
    HeaderPrefix::new(prefix).map(|_| ()).map_err(|e| match e {
        crate::error::AuthProxyError::InvalidHeaderPrefix { reason, .. } => reason,
        other => other.to_string(),
    })
}

fn is_hex_digest(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

fn validate_token(i: usize, entry: &TokenEntry, prefix: &str, errors: &mut Vec<ValidationError>) {
    let field = format!("auth.tokens[{i}]");

    match (&entry.token, &entry.token_sha256) {
        (Some(_), Some(_)) => errors.push(
            ValidationError::new(&field, "both 'token' and 'token_sha256' are set")
                .with_suggestion("keep only 'token_sha256' to avoid storing the secret"),
        ),
        (None, None) => errors.push(ValidationError::new(
            &field,
            "one of 'token' or 'token_sha256' is required",
        )),
        (Some(token), None) if token.trim().is_empty() => {
            errors.push(ValidationError::new(
                format!("{field}.token"),
                "token cannot be empty",
            ));
        }
        (None, Some(digest)) if !is_hex_digest(digest) => errors.push(
            ValidationError::new(
                format!("{field}.token_sha256"),
                "must be 64 hexadecimal characters",
            )
            .with_suggestion("generate one with `printf %s TOKEN | sha256sum`"),
        ),
        _ => {}
    }

    for claim in entry.claims.keys() {
        let header = format!("{prefix}{claim}");
        if claim.is_empty() || header.parse::<HeaderName>().is_err() {
            errors.push(ValidationError::new(
                format!("{field}.claims.{claim}"),
                format!("'{header}' is not a valid header name"),
            ));
        }
    }
    for (claim, value) in &entry.claims {
        if axum::http::HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::new(
                format!("{field}.claims.{claim}"),
                "value contains characters not allowed in a header",
            ));
        }
    }
}

pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(message) = validate_base_url(&config.forward.base_url) {
        errors.push(ValidationError::new("forward.base_url", message));
    }

    let prefix = config.effective_header_prefix();
    if let Err(message) = validate_header_prefix(prefix) {
        let mut error = ValidationError::new("header_prefix", message);
        if !prefix.ends_with(PREFIX_SEPARATOR) {
            error = error.with_suggestion(format!("did you mean '{prefix}{PREFIX_SEPARATOR}'?"));
        }
        errors.push(error);
    }

    if !config.health_path.starts_with('/') {
        errors.push(
            ValidationError::new("health_path", "path must start with '/'")
                .with_suggestion(format!("did you mean '/{}'?", config.health_path)),
        );
    } else if config.health_path.contains(['{', '}', '*', ':']) {
        errors.push(ValidationError::new(
            "health_path",
            "path must be literal (no '{', '}', '*', or ':')",
        ));
    }

    if config.auth.tokens.is_empty() {
        errors.push(ValidationError::new(
            "auth.tokens",
            "at least one token must be defined",
        ));
    }

    for (i, entry) in config.auth.tokens.iter().enumerate() {
        validate_token(i, entry, prefix, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Format a human-readable summary of a valid config.
#[must_use]
pub fn format_validation_report(path: &str, config: &Config) -> String {
    format!(
        "{path} is valid\n  forward:  {}\n  prefix:   {}\n  tokens:   {} ({} claims)",
        config.forward.base_url,
        config.effective_header_prefix(),
        config.auth.tokens.len(),
        config.total_claims(),
    )
}
