//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "ytgen_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "ytgen_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "ytgen_http_requests_in_flight";

    // Transcription metrics
    pub const TRANSCRIPTIONS_STARTED_TOTAL: &str = "ytgen_transcriptions_started_total";
    pub const TRANSCRIPTIONS_COMPLETED_TOTAL: &str = "ytgen_transcriptions_completed_total";
    pub const TRANSCRIPTIONS_FAILED_TOTAL: &str = "ytgen_transcriptions_failed_total";

    // Generation metrics
    pub const GENERATIONS_TOTAL: &str = "ytgen_generations_total";
    pub const GENERATION_DURATION_SECONDS: &str = "ytgen_generation_duration_seconds";
    pub const REFINEMENTS_TOTAL: &str = "ytgen_refinements_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "ytgen_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a transcription job submission.
pub fn record_transcription_started(tier: &str) {
    let labels = [("tier", tier.to_string())];
    counter!(names::TRANSCRIPTIONS_STARTED_TOTAL, &labels).increment(1);
}

/// Record a transcription job outcome.
pub fn record_transcription_finished(success: bool) {
    if success {
        counter!(names::TRANSCRIPTIONS_COMPLETED_TOTAL).increment(1);
    } else {
        counter!(names::TRANSCRIPTIONS_FAILED_TOTAL).increment(1);
    }
}

/// Record a generation call.
pub fn record_generation(agent_type: &str, success: bool, duration_secs: f64) {
    let labels = [
        ("agent_type", agent_type.to_string()),
        ("outcome", if success { "ok" } else { "error" }.to_string()),
    ];
    counter!(names::GENERATIONS_TOTAL, &labels).increment(1);
    histogram!(names::GENERATION_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a refinement turn.
pub fn record_refinement(agent_type: &str, draft_updated: bool) {
    let labels = [
        ("agent_type", agent_type.to_string()),
        ("draft_updated", draft_updated.to_string()),
    ];
    counter!(names::REFINEMENTS_TOTAL, &labels).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

fn uuid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
            .expect("valid regex")
    })
}

/// Sanitize path for metrics labels (replace IDs with placeholders).
fn sanitize_path(path: &str) -> String {
    uuid_re().replace_all(path, ":id").to_string()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/api/assets/550e8400-e29b-41d4-a716-446655440000/transcribe"),
            "/api/assets/:id/transcribe"
        );
        assert_eq!(sanitize_path("/api/assets"), "/api/assets");
    }
}
