//! Metrics collection and exposition.
//!
//! # Metrics
//! - `blog_requests_total` (counter): requests by method, status
//! - `blog_request_duration_seconds` (histogram): latency by method
//! - `blog_rate_limited_total` (counter): requests rejected by the limiter
//! - `blog_panics_total` (counter): panics caught by the pipeline
//! - `blog_limiter_clients` (gauge): clients tracked by the limiter
//!
//! Without an installed recorder every call is a no-op, so handlers and
//! tests never need to check whether metrics are enabled.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install metrics recorder: {}", e))?;

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, duration_secs: f64) {
    counter!(
        "blog_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("blog_request_duration_seconds", "method" => method.to_string())
        .record(duration_secs);
}

pub fn record_rate_limited() {
    counter!("blog_rate_limited_total").increment(1);
}

pub fn record_panic() {
    counter!("blog_panics_total").increment(1);
}

pub fn set_limiter_clients(count: usize) {
    gauge!("blog_limiter_clients").set(count as f64);
}

/// Outermost layer: times every request, including rejected ones.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let response = next.run(request).await;

    record_request(
        &method,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}
