//! `authproxy health` — check the health of a running instance.
//!
//! Sends a `GET` to the instance's health path and displays the response
//! as formatted text or raw JSON.

use http_body_util::BodyExt;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::cli::HealthArgs;
use crate::error::AuthProxyError;
use crate::health::HealthResponse;

pub async fn execute(args: HealthArgs) -> Result<(), AuthProxyError> {
    let url = health_url(&args.url, &args.path);
    let uri: hyper::Uri =
        url.parse().map_err(
            |e: hyper::http::uri::InvalidUri| AuthProxyError::UriParse {
                source: Box::new(e),
            },
        )?;

    let connector = hyper_util::client::legacy::connect::HttpConnector::new();
    let client = Client::builder(TokioExecutor::new()).build(connector);

    let req = hyper::Request::builder()
        .uri(uri)
        .body(http_body_util::Full::new(bytes::Bytes::new()))
        .map_err(|e| AuthProxyError::HttpRequest {
            source: Box::new(e),
        })?;

    let response = tokio::time::timeout(std::time::Duration::from_secs(10), client.request(req))
        .await
        .map_err(|_| AuthProxyError::HttpRequest {
            source: "health check timed out after 10s".into(),
        })?
        .map_err(|e| AuthProxyError::HttpRequest {
            source: Box::new(e),
        })?;

    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(|e| AuthProxyError::HttpRequest {
            source: Box::new(e),
        })?
        .to_bytes();

    if !status.is_success() {
        return Err(AuthProxyError::HealthCheckFailed(status));
    }

    if args.json {
        println!("{}", String::from_utf8_lossy(&body));
        return Ok(());
    }

    match serde_json::from_slice::<HealthResponse>(&body) {
        Ok(health) => {
            println!("\u{2713} authproxy is healthy ({})", args.url);
            println!("  uptime:         {}", format_uptime(health.uptime_seconds));
            println!("  destination:    {}", health.destination);
            println!("  header prefix:  {}", health.header_prefix);
            println!(
                "  requests:       {} forwarded, {} unauthorized, {} failed",
                health.stats.requests_forwarded,
                health.stats.requests_unauthorized,
                health.stats.requests_failed
            );
            println!("  relay errors:   {}", health.stats.relay_errors);
        }
        Err(e) => {
            eprintln!("Failed to parse health response: {e}");
            println!("{}", String::from_utf8_lossy(&body));
        }
    }

    Ok(())
}

fn health_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn format_uptime(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_url_and_path() {
        assert_eq!(
            health_url("http://localhost:3000/", "/_authproxy/health"),
            "http://localhost:3000/_authproxy/health"
        );
        assert_eq!(
            health_url("http://localhost:3000", "healthz"),
            "http://localhost:3000/healthz"
        );
    }

    #[test]
    fn formats_uptime() {
        assert_eq!(format_uptime(5), "5s");
        assert_eq!(format_uptime(65), "1m 5s");
        assert_eq!(format_uptime(3725), "1h 2m 5s");
    }
}
