//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands (run, validate, health), and their associated argument
//! structs. Every `run` flag has an environment variable equivalent for
//! container deployments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::model::DEFAULT_HEALTH_PATH;

#[derive(Parser)]
#[command(
    name = "authproxy",
    version,
    about = "Authenticating reverse HTTP proxy",
    propagate_version = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        authproxy run                        Start with ./authproxy.yaml\n  \
        authproxy run -c proxy.yaml          Start with a specific config\n  \
        authproxy validate proxy.yaml        Check a config without starting"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the proxy server
    Run(Box<RunArgs>),

    /// Validate a config file without starting
    Validate(ValidateArgs),

    /// Check health of a running instance
    Health(HealthArgs),
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        authproxy run                                          Auto-detect config\n  \
        authproxy run -c proxy.yaml -p 8080 --pretty           Local dev mode\n  \
        authproxy run --forward-url http://backend:8000/       Override destination")]
pub struct RunArgs {
    /// Config file path (.yaml, .json, .toml)
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Listen address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    // -- Forwarding --
    /// Upstream base URL (overrides `forward.base_url`)
    #[arg(long, env = "FORWARD_URL", help_heading = "Forwarding")]
    pub forward_url: Option<String>,

    /// Prefix for trusted identity headers (overrides `header_prefix`)
    #[arg(long, env = "HEADER_PREFIX", help_heading = "Forwarding")]
    pub header_prefix: Option<String>,

    // -- Logging --
    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Config file to validate
    #[arg(default_value = "authproxy.yaml")]
    pub config: PathBuf,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: ValidateFormat,
}

#[derive(Args)]
pub struct HealthArgs {
    /// URL of the running instance
    #[arg(default_value = "http://localhost:3000")]
    pub url: String,

    /// Health endpoint path on that instance
    #[arg(long, default_value = DEFAULT_HEALTH_PATH)]
    pub path: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ValidateFormat {
    Text,
    Json,
}
