//! Prometheus metrics for request tracking and todo activity.
//!
//! Metrics go through the `metrics` facade. Without an installed recorder
//! every call is a no-op, so handlers and tests never need to care.

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::debug;

// === Metric Name Constants ===

/// HTTP request latency metric name.
pub const METRIC_HTTP_REQUEST_LATENCY: &str = "http_request_latency_ms";
/// HTTP requests counter metric name.
pub const METRIC_HTTP_REQUESTS: &str = "http_requests_total";
/// Todos created counter metric name.
pub const METRIC_TODOS_CREATED: &str = "todos_created_total";
/// Todos deleted counter metric name.
pub const METRIC_TODOS_DELETED: &str = "todos_deleted_total";
/// Rate-limited requests counter metric name.
pub const METRIC_RATE_LIMITED: &str = "rate_limited_total";

/// Install the Prometheus recorder and register metric descriptions.
/// Call this once at startup.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_histogram!(
        METRIC_HTTP_REQUEST_LATENCY,
        "HTTP request latency in milliseconds"
    );
    describe_counter!(METRIC_HTTP_REQUESTS, "Total number of HTTP requests");
    describe_counter!(METRIC_TODOS_CREATED, "Total number of todos created");
    describe_counter!(METRIC_TODOS_DELETED, "Total number of todos deleted");
    describe_counter!(
        METRIC_RATE_LIMITED,
        "Total number of requests rejected by the rate limiter"
    );

    debug!("Metrics initialized");
    Ok(handle)
}

/// Record HTTP request latency.
pub fn record_http_latency(start: Instant, method: &str, path: &str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(
        METRIC_HTTP_REQUEST_LATENCY,
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(latency_ms);
}

/// Increment HTTP request counter.
pub fn inc_http_requests(method: &str, path: &str, status: u16) {
    counter!(
        METRIC_HTTP_REQUESTS,
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Increment todos created counter.
pub fn inc_todos_created() {
    counter!(METRIC_TODOS_CREATED).increment(1);
}

/// Add to todos deleted counter.
pub fn inc_todos_deleted(count: u64) {
    counter!(METRIC_TODOS_DELETED).increment(count);
}

/// Increment rate-limited counter.
pub fn inc_rate_limited() {
    counter!(METRIC_RATE_LIMITED).increment(1);
}

/// Middleware recording a counter and latency per matched route.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let response = next.run(request).await;

    record_http_latency(start, &method, &path);
    inc_http_requests(&method, &path, response.status().as_u16());
    response
}
