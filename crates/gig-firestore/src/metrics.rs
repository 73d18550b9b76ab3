//! Store metrics.

use metrics::{counter, histogram};

/// Metric name constants.
pub mod names {
    /// Total store requests by backend, operation and status.
    pub const REQUESTS_TOTAL: &str = "gig_store_requests_total";

    /// Total retry attempts by operation.
    pub const RETRIES_TOTAL: &str = "gig_store_retries_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "gig_store_latency_seconds";

    /// Documents returned by list operations, by collection.
    pub const LIST_DOCUMENTS_RETURNED_TOTAL: &str = "gig_store_list_documents_returned_total";
}

/// Record metrics for a completed Firestore request.
pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "backend" => "firestore",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

/// Record a retry attempt.
pub fn record_retry(operation: &str) {
    counter!(names::RETRIES_TOTAL, "operation" => operation.to_string()).increment(1);
}

/// Record how many documents a list call returned.
pub fn record_listed(collection: &str, returned: u64) {
    counter!(
        names::LIST_DOCUMENTS_RETURNED_TOTAL,
        "collection" => collection.to_string()
    )
    .increment(returned);
}
