//! Configuration loading and validation.
//!
//! [`load`] reads a config file, picks the parser from its extension,
//! and runs [`validation::validate`] before handing the [`Config`] back.
//! [`resolve_path`] auto-detects `authproxy.{yaml,yml,json,toml}` in the
//! working directory when no path is given.

pub mod model;
pub mod validation;

use std::path::{Path, PathBuf};

use crate::error::AuthProxyError;
use model::Config;

const CANDIDATES: [&str; 4] = [
    "authproxy.yaml",
    "authproxy.yml",
    "authproxy.json",
    "authproxy.toml",
];

/// Parse a config string based on file extension.
pub fn parse_config_str(
    ext: &str,
    content: &str,
    path_display: &str,
) -> Result<Config, AuthProxyError> {
    match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => serde_yml::from_str(content).map_err(|e| AuthProxyError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        "json" => serde_json::from_str(content).map_err(|e| AuthProxyError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        #[cfg(feature = "toml")]
        "toml" => toml::from_str(content).map_err(|e| AuthProxyError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        other => Err(AuthProxyError::UnsupportedFormat(other.to_string())),
    }
}

/// Pick the config file: the explicit path, or the first candidate that
/// exists in the working directory.
pub async fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf, AuthProxyError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    for name in &CANDIDATES {
        let path = PathBuf::from(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::info!(path = %path.display(), "auto-detected config file");
            return Ok(path);
        }
    }

    Err(AuthProxyError::NoConfigSource {
        hint: "Provide --config <file> or create ./authproxy.yaml.".into(),
    })
}

/// Read and parse a config file without validating it.
pub async fn read(path: &Path) -> Result<Config, AuthProxyError> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AuthProxyError::ConfigFileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            AuthProxyError::Io(e)
        }
    })?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    parse_config_str(ext, &content, &path.display().to_string())
}

/// Read, parse, and validate a config file.
pub async fn load(path: &Path) -> Result<Config, AuthProxyError> {
    let config = read(path).await?;
    validation::validate(&config).map_err(|errors| AuthProxyError::ConfigValidation { errors })?;
    Ok(config)
}
