//! `authproxy run` — start the proxy server.
//!
//! Loads and validates configuration, applies CLI overrides, builds the
//! reverse proxy pipeline, and serves it with Axum until Ctrl+C or
//! SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::auth::TokenAuthenticator;
use crate::cli::RunArgs;
use crate::config::model::Config;
use crate::config::{self, validation};
use crate::error::AuthProxyError;
use crate::logging;
use crate::proxy::forwarder::HttpForwarder;
use crate::proxy::ReverseProxy;
use crate::server::{self, AppState};

pub async fn execute(args: RunArgs) -> Result<(), AuthProxyError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(&args.log_level, log_format);

    let path = config::resolve_path(args.config.as_deref()).await?;
    let mut config = config::read(&path).await?;
    apply_overrides(&mut config, &args)?;

    let authenticator = TokenAuthenticator::from_config(&config.auth);
    let token_count = authenticator.len();

    let proxy = ReverseProxy::builder()
        .header_prefix(config.header_prefix.clone())
        .authenticator(authenticator)
        .forwarder(HttpForwarder::new(config.forward.base_url.clone()))
        .build()?;

    let state = Arc::new(AppState::new(proxy, config.health_path.clone()));
    let router = server::build_router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        config = %path.display(),
        destination = %config.forward.base_url,
        header_prefix = %config.effective_header_prefix(),
        tokens = token_count,
        "authproxy started"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    tracing::info!("authproxy stopped");
    Ok(())
}

/// Layer CLI/env values over the file, then validate the merged result.
fn apply_overrides(config: &mut Config, args: &RunArgs) -> Result<(), AuthProxyError> {
    if let Some(ref url) = args.forward_url {
        config.forward.base_url.clone_from(url);
    }
    if let Some(ref prefix) = args.header_prefix {
        config.header_prefix.clone_from(prefix);
    }
    validation::validate(config).map_err(|errors| AuthProxyError::ConfigValidation { errors })
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::{Cli, Commands};

    const FILE: &str = r#"{
        "forward": { "base_url": "ftp://unused.example/" },
        "header_prefix": "Internal-",
        "auth": { "tokens": [{ "token": "test", "claims": { "user": "test" } }] }
    }"#;

    fn run_args(flags: &[&str]) -> RunArgs {
        let argv = ["authproxy", "run"].into_iter().chain(flags.iter().copied());
        match Cli::try_parse_from(argv).unwrap().command {
            Some(Commands::Run(args)) => *args,
            _ => panic!("expected run subcommand"),
        }
    }

    fn file_config() -> Config {
        config::parse_config_str("json", FILE, "authproxy.json").unwrap()
    }

    #[test]
    fn flags_replace_file_values_before_validation() {
        let mut config = file_config();
        let args = run_args(&[
            "--forward-url",
            "http://backend:8000/",
            "--header-prefix",
            "X-Auth-",
        ]);

        apply_overrides(&mut config, &args).unwrap();

        assert_eq!(config.forward.base_url, "http://backend:8000/");
        assert_eq!(config.header_prefix, "X-Auth-");
    }

    #[test]
    fn file_values_are_validated_without_overrides() {
        let mut config = file_config();
        let err = apply_overrides(&mut config, &run_args(&[])).unwrap_err();
        assert!(matches!(err, AuthProxyError::ConfigValidation { .. }));
    }

    #[test]
    fn invalid_override_is_rejected() {
        let mut config = file_config();
        let args = run_args(&[
            "--forward-url",
            "http://backend:8000/",
            "--header-prefix",
            "X-Auth",
        ]);

        let AuthProxyError::ConfigValidation { errors } =
            apply_overrides(&mut config, &args).unwrap_err()
        else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "header_prefix");
    }
}
