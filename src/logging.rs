//! Structured logging setup using the `tracing` ecosystem.
//!
//! JSON output flattens event fields to the top level, so every pipeline
//! log line carries `correlation_id`, `outcome` and friends as plain keys.
//! Pretty output is used on a TTY or with `--pretty`.

use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::LogLevel;

/// Connection-level crates that are too chatty below `warn`.
const TRANSPORT_TARGETS: [&str; 3] = ["hyper", "hyper_util", "rustls"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[must_use]
pub fn resolve_format(pretty: bool, json: bool) -> LogFormat {
    if json {
        LogFormat::Json
    } else if pretty || std::io::IsTerminal::is_terminal(&std::io::stdout()) {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

/// Filter: `level` for the proxy and request tracing, capped at `warn`
/// for the transport stack.
#[must_use]
pub fn targets(level: Level) -> Targets {
    TRANSPORT_TARGETS
        .iter()
        .fold(Targets::new().with_default(level), |filter, target| {
            filter.with_target(*target, level.min(Level::WARN))
        })
}

pub fn init(level: &LogLevel, format: LogFormat) {
    let filter = targets(level.to_tracing_level());

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .flatten_event(true)
                        .with_current_span(false)
                        .with_span_list(false)
                        .with_target(false),
                )
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_wins() {
        assert_eq!(resolve_format(false, true), LogFormat::Json);
    }

    #[test]
    fn pretty_flag_forces_pretty() {
        assert_eq!(resolve_format(true, false), LogFormat::Pretty);
    }

    #[test]
    fn debug_level_keeps_transport_at_warn() {
        let filter = targets(Level::DEBUG);
        assert!(filter.would_enable("authproxy::proxy", &Level::DEBUG));
        assert!(filter.would_enable("tower_http::trace", &Level::DEBUG));
        assert!(!filter.would_enable("hyper_util::client", &Level::DEBUG));
        assert!(filter.would_enable("hyper_util::client", &Level::WARN));
    }

    #[test]
    fn error_level_applies_everywhere() {
        let filter = targets(Level::ERROR);
        assert!(!filter.would_enable("rustls::conn", &Level::WARN));
        assert!(!filter.would_enable("authproxy", &Level::WARN));
        assert!(filter.would_enable("authproxy", &Level::ERROR));
    }
}
