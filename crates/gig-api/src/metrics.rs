//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex_lite::Regex;
use std::sync::LazyLock;
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "gig_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "gig_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "gig_http_requests_in_flight";

    // Marketplace metrics
    pub const AUTH_EVENTS_TOTAL: &str = "gig_auth_events_total";
    pub const JOBS_CREATED_TOTAL: &str = "gig_jobs_created_total";
    pub const BIDS_TOTAL: &str = "gig_bids_total";
    pub const BID_RETRIES_TOTAL: &str = "gig_bid_retries_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "gig_rate_limit_hits_total";
}

/// Record an HTTP request. `path` must already be a bounded label.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a registration or login outcome.
pub fn record_auth_event(event: &str, outcome: &str) {
    let labels = [("event", event.to_string()), ("outcome", outcome.to_string())];
    counter!(names::AUTH_EVENTS_TOTAL, &labels).increment(1);
}

/// Record job posted.
pub fn record_job_created() {
    counter!(names::JOBS_CREATED_TOTAL).increment(1);
}

/// Record a bid submission outcome.
pub fn record_bid(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::BIDS_TOTAL, &labels).increment(1);
}

/// Record a bid append that lost a race and was retried.
pub fn record_bid_retry() {
    counter!(names::BID_RETRIES_TOTAL).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

static JOB_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/jobs/[^/]+").expect("valid job path pattern"));

/// UUIDs, plain numbers, and any token carrying a digit.
static ID_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}|[0-9]+|[A-Za-z0-9_.-]*[0-9][A-Za-z0-9_.-]*)$",
    )
    .expect("valid id segment pattern")
});

/// Sanitize path for metrics labels (collapse ids into placeholders).
fn sanitize_path(path: &str) -> String {
    let path = JOB_PATH.replace_all(path, "/jobs/:job_id");
    path.split('/')
        .map(|segment| if ID_SEGMENT.is_match(segment) { ":id" } else { segment })
        .collect::<Vec<_>>()
        .join("/")
}

/// Label for a request path: the route template when a route matched,
/// otherwise the sanitized raw path.
pub fn path_label<B>(request: &Request<B>) -> String {
    match request.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_string(),
        None => sanitize_path(request.uri().path()),
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = path_label(&request);
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
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/api/jobs/550e8400-e29b-41d4-a716-446655440000/bid"),
            "/api/jobs/:job_id/bid"
        );
        assert_eq!(sanitize_path("/api/jobs"), "/api/jobs");
        assert_eq!(sanitize_path("/api/jobs/"), "/api/jobs/");
        assert_eq!(
            sanitize_path("/api/users/550e8400-e29b-41d4-a716-446655440000"),
            "/api/users/:id"
        );
        assert_eq!(sanitize_path("/pay/42"), "/pay/:id");
        assert_eq!(sanitize_path("/health"), "/health");
    }

    #[test]
    fn test_sanitize_path_collapses_mixed_tokens() {
        assert_eq!(sanitize_path("/api/anything/abc123xyz"), "/api/anything/:id");
        assert_eq!(sanitize_path("/api/anything/else"), "/api/anything/else");
        assert_eq!(sanitize_path("/a1/b2/c3"), "/:id/:id/:id");
    }

    async fn echo_label(request: Request<Body>, next: Next) -> Response<Body> {
        let label = path_label(&request);
        let mut response = next.run(request).await;
        response
            .headers_mut()
            .insert("x-path-label", label.parse().unwrap());
        response
    }

    async fn label_for(uri: &str) -> (StatusCode, String) {
        let app = Router::new()
            .route("/api/jobs/:job_id/bid", get(|| async { "ok" }))
            .fallback(|| async { StatusCode::NOT_FOUND })
            .layer(axum::middleware::from_fn(echo_label));
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let label = response.headers()["x-path-label"].to_str().unwrap().to_string();
        (response.status(), label)
    }

    #[tokio::test]
    async fn test_path_label_uses_route_template() {
        let (status, label) = label_for("/api/jobs/job-abc/bid").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(label, "/api/jobs/:job_id/bid");

        let (status, label) = label_for("/api/anything/abc123xyz").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(label, "/api/anything/:id");
    }
}
