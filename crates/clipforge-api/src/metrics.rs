//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "clipforge_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "clipforge_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "clipforge_http_requests_in_flight";

    // Compilation metrics
    pub const COMPILATIONS_TOTAL: &str = "clipforge_compilations_total";
    pub const COMPILATIONS_FAILED_TOTAL: &str = "clipforge_compilations_failed_total";
    pub const COMPILATION_DURATION_SECONDS: &str = "clipforge_compilation_duration_seconds";
    pub const COMPILATION_SOURCES: &str = "clipforge_compilation_sources";

    // Quote metrics
    pub const QUOTES_RENDERED_TOTAL: &str = "clipforge_quotes_rendered_total";

    // Storage metrics
    pub const UPLOAD_DURATION_SECONDS: &str = "clipforge_upload_duration_seconds";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "clipforge_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a finished compilation.
pub fn record_compilation(source_count: usize, duration_secs: f64) {
    counter!(names::COMPILATIONS_TOTAL).increment(1);
    histogram!(names::COMPILATION_DURATION_SECONDS).record(duration_secs);
    histogram!(names::COMPILATION_SOURCES).record(source_count as f64);
}

/// Record a failed compilation.
pub fn record_compilation_failed(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::COMPILATIONS_FAILED_TOTAL, &labels).increment(1);
}

/// Record a rendered quote image.
pub fn record_quote_rendered() {
    counter!(names::QUOTES_RENDERED_TOTAL).increment(1);
}

/// Record upload duration.
pub fn record_upload_duration(duration_secs: f64) {
    histogram!(names::UPLOAD_DURATION_SECONDS).record(duration_secs);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
