//! Tests for the Firestore client against a mocked REST endpoint.

use std::time::Duration;

use serde_json::json;
use serial_test::serial;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::client::{FirestoreClient, FirestoreConfig};
use crate::error::FirestoreError;
use crate::retry::RetryConfig;
use crate::store::DocumentStore;
use crate::types::{Fields, ToFirestoreValue, Write};

const DOCS: &str = "/v1/projects/test-project/databases/(default)/documents";

// =============================================================================
// Test Helpers
// =============================================================================

async fn test_client(server: &MockServer) -> FirestoreClient {
    let mut config = FirestoreConfig::emulator("test-project", server.address().to_string());
    config.retry = RetryConfig {
        max_retries: 2,
        base_delay_ms: 1,
        max_delay_ms: 5,
    };
    FirestoreClient::new(config).await.unwrap()
}

fn job_doc(update_time: &str) -> serde_json::Value {
    json!({
        "name": "projects/test-project/databases/(default)/documents/jobs/job-1",
        "fields": {
            "title": {"stringValue": "Logo"},
            "budget": {"doubleValue": 100.0},
            "bids": {"arrayValue": {}}
        },
        "createTime": "2025-01-01T00:00:00.000001Z",
        "updateTime": update_time
    })
}

// =============================================================================
// Config Tests
// =============================================================================

#[test]
#[serial]
fn test_config_validates_empty_project_id() {
    std::env::set_var("GCP_PROJECT_ID", "");
    std::env::remove_var("FIREBASE_PROJECT_ID");
    let result = FirestoreConfig::from_env();
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_config_accepts_firebase_project_id() {
    std::env::remove_var("GCP_PROJECT_ID");
    std::env::set_var("FIREBASE_PROJECT_ID", "firebase-project");
    let config = FirestoreConfig::from_env().unwrap();
    assert_eq!(config.project_id, "firebase-project");
    std::env::remove_var("FIREBASE_PROJECT_ID");
}

#[test]
#[serial]
fn test_config_prefers_gcp_project_id() {
    std::env::set_var("GCP_PROJECT_ID", "gcp-project");
    std::env::set_var("FIREBASE_PROJECT_ID", "firebase-project");
    let config = FirestoreConfig::from_env().unwrap();
    assert_eq!(config.project_id, "gcp-project");
    std::env::remove_var("GCP_PROJECT_ID");
    std::env::remove_var("FIREBASE_PROJECT_ID");
}

#[test]
#[serial]
fn test_config_parses_timeouts_and_emulator() {
    std::env::set_var("GCP_PROJECT_ID", "test");
    std::env::set_var("FIRESTORE_CONNECT_TIMEOUT_SECS", "not-a-number");
    std::env::set_var("FIRESTORE_EMULATOR_HOST", "localhost:8080");
    std::env::set_var("FIRESTORE_RETRY_BASE_MS", "50");
    let config = FirestoreConfig::from_env().unwrap();
    assert_eq!(config.connect_timeout, Duration::from_secs(5));
    assert_eq!(config.emulator_host.as_deref(), Some("localhost:8080"));
    assert_eq!(config.retry.base_delay_ms, 50);
    for var in [
        "GCP_PROJECT_ID",
        "FIRESTORE_CONNECT_TIMEOUT_SECS",
        "FIRESTORE_EMULATOR_HOST",
        "FIRESTORE_RETRY_BASE_MS",
    ] {
        std::env::remove_var(var);
    }
}

// =============================================================================
// Request Tests
// =============================================================================

#[tokio::test]
async fn test_get_document_found_and_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/jobs/job-1", DOCS)))
        .and(header("authorization", "Bearer owner"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_doc("2025-01-01T00:00:00.000001Z")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/jobs/nope", DOCS)))
        .respond_with(ResponseTemplate::new(404).set_body_string("NOT_FOUND"))
        .mount(&server)
        .await;

    let client = test_client(&server).await;

    let doc = client.get_document("jobs", "job-1").await.unwrap().unwrap();
    assert_eq!(doc.id(), Some("job-1"));
    assert_eq!(doc.get::<String>("title").as_deref(), Some("Logo"));
    assert_eq!(doc.update_time.as_deref(), Some("2025-01-01T00:00:00.000001Z"));

    assert!(client.get_document("jobs", "nope").await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_document_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/jobs/job-1", DOCS)))
        .respond_with(ResponseTemplate::new(503).set_body_string("UNAVAILABLE"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/jobs/job-1", DOCS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_doc("2025-01-01T00:00:00.000001Z")))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let doc = client.get_document("jobs", "job-1").await.unwrap();
    assert!(doc.is_some());
}

#[tokio::test]
async fn test_disabled_retry_surfaces_first_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/jobs/job-1", DOCS)))
        .respond_with(ResponseTemplate::new(503).set_body_string("UNAVAILABLE"))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = FirestoreConfig::emulator("test-project", server.address().to_string());
    config.retry = RetryConfig::disabled();
    let client = FirestoreClient::new(config).await.unwrap();

    let err = client.get_document("jobs", "job-1").await.unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_update_with_precondition_sends_update_time() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(format!("{}/jobs/job-1", DOCS)))
        .and(query_param("updateMask.fieldPaths", "bids"))
        .and(query_param("currentDocument.updateTime", "2025-01-01T00:00:00.000001Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_doc("2025-01-01T00:00:01.000001Z")))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let mut fields = Fields::new();
    fields.insert("bids".to_string(), Vec::<String>::new().to_firestore_value());

    let doc = client
        .update_document_with_precondition(
            "jobs",
            "job-1",
            fields,
            Some(vec!["bids".to_string()]),
            Some("2025-01-01T00:00:00.000001Z"),
        )
        .await
        .unwrap();
    assert_eq!(doc.update_time.as_deref(), Some("2025-01-01T00:00:01.000001Z"));
}

#[tokio::test]
async fn test_update_with_stale_version_is_precondition_failure() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(format!("{}/jobs/job-1", DOCS)))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "the stored version does not match", "status": "FAILED_PRECONDITION"}
        })))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let err = client
        .update_document_with_precondition("jobs", "job-1", Fields::new(), None, Some("stale"))
        .await
        .unwrap_err();
    assert!(err.is_precondition_failed());
}

#[tokio::test]
async fn test_commit_conflict_maps_to_already_exists() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}:commit", DOCS)))
        .and(body_partial_json(json!({
            "writes": [{"currentDocument": {"exists": false}}]
        })))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": {"code": 409, "status": "ALREADY_EXISTS"}
        })))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let name = client.full_document_name("user_emails", "alice%40example.com");
    assert_eq!(
        name,
        "projects/test-project/databases/(default)/documents/user_emails/alice%40example.com"
    );

    let err = client.commit(vec![Write::create(name, Fields::new())]).await.unwrap_err();
    assert!(matches!(err, FirestoreError::AlreadyExists(_)));
}

#[tokio::test]
async fn test_batch_get_skips_missing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}:batchGet", DOCS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"found": job_doc("2025-01-01T00:00:00.000001Z")},
            {"missing": "projects/test-project/databases/(default)/documents/jobs/gone"}
        ])))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let docs = client
        .batch_get_documents(vec![
            client.full_document_name("jobs", "job-1"),
            client.full_document_name("jobs", "gone"),
        ])
        .await
        .unwrap();
    assert_eq!(docs.len(), 1);
    assert!(client.batch_get_documents(vec![]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_batch_get_rejects_oversized_requests() {
    let server = MockServer::start().await;
    let client = test_client(&server).await;
    let names = (0..101).map(|i| client.full_document_name("users", &i.to_string())).collect();
    assert!(client.batch_get_documents(names).await.is_err());
}

#[tokio::test]
async fn test_list_documents_passes_page_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/jobs", DOCS)))
        .and(query_param("pageToken", "next"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "documents": [job_doc("2025-01-01T00:00:00.000001Z")]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let page = client.list_documents("jobs", Some(50), Some("next")).await.unwrap();
    assert_eq!(page.documents.map(|d| d.len()), Some(1));
    assert!(page.next_page_token.is_none());
}
