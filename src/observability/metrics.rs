//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define proxy metrics (requests, latency, engine calls)
//! - Expose Prometheus-compatible metrics endpoint when configured
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by route, method, status
//! - `proxy_request_duration_seconds` (histogram): latency by route
//! - `proxy_engine_calls_total` (counter): engine calls by call, outcome
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Route label is one of the known paths or `other`, to bound cardinality

use std::net::SocketAddr;
use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Label for a request path.
pub fn route_label(path: &str) -> &'static str {
    match path {
        "/version" => "/version",
        "/languages" => "/languages",
        "/parse" => "/parse",
        _ => "other",
    }
}

/// Record a completed request.
pub fn record_request(route: &'static str, method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "proxy_requests_total",
        "route" => route,
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("proxy_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

/// Record the outcome of one engine call (`ok`, `syntax_error`, `error`).
pub fn record_engine_call(call: &'static str, outcome: &'static str) {
    metrics::counter!("proxy_engine_calls_total", "call" => call, "outcome" => outcome).increment(1);
}

/// Middleware recording every request passing through the router.
pub async fn track_requests(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let route = route_label(request.uri().path());
    let method = request.method().clone();

    let response = next.run(request).await;

    record_request(route, method.as_str(), response.status().as_u16(), start);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_label() {
        assert_eq!(route_label("/parse"), "/parse");
        assert_eq!(route_label("/version"), "/version");
        assert_eq!(route_label("/parse/extra"), "other");
        assert_eq!(route_label("/"), "other");
    }

    #[test]
    fn test_recording_without_exporter() {
        // No recorder installed: must not panic.
        record_request("/parse", "POST", 200, Instant::now());
        record_engine_call("parse", "ok");
    }
}
