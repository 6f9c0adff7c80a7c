mod common;

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use form_mirror::error::PersistenceError;
use form_mirror::server::store::{
    JsonlSubmissionStore, MemorySubmissionStore, SubmissionRecord, SubmissionStore,
};
use form_mirror::server::validation::{Step1Submission, validate_step1};
use form_mirror::server::{AppState, build_router, check_schema};
use form_mirror::client::submit::{HttpSubmissionClient, SubmissionClient};
use serde_json::{Map, Value, json};
use tower::ServiceExt;

struct FailingStore;

impl SubmissionStore for FailingStore {
    fn insert(&self, _record: SubmissionRecord) -> Result<SubmissionRecord, PersistenceError> {
        Err(PersistenceError::Unavailable("database is down".into()))
    }
}

async fn post_step1(store: Arc<dyn SubmissionStore>, body: Value) -> (StatusCode, Value) {
    let app = build_router(AppState::new(store));
    let request = Request::builder()
        .method("POST")
        .uri("/api/udyam/step1")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post_raw(content_type: Option<&str>, body: &str) -> (StatusCode, Value) {
    let app = build_router(AppState::new(Arc::new(MemorySubmissionStore::new())));
    let mut request = Request::builder().method("POST").uri("/api/udyam/step1");
    if let Some(content_type) = content_type {
        request = request.header("content-type", content_type);
    }

    let response = app
        .oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn submission(aadhaar: Option<&str>, name: Option<&str>) -> Step1Submission {
    Step1Submission {
        aadhaar_number: aadhaar.map(str::to_string),
        entrepreneur_name: name.map(str::to_string),
    }
}

// ============================================================================
// Routes
// ============================================================================

#[tokio::test]
async fn test_liveness() {
    let app = build_router(AppState::new(Arc::new(MemorySubmissionStore::new())));
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({ "message": "server is alive" }));
}

#[tokio::test]
async fn test_valid_submission_is_saved() {
    let store = Arc::new(MemorySubmissionStore::new());
    let (status, body) = post_step1(
        store.clone(),
        json!({ "aadhaarNumber": "123456789012", "entrepreneurName": "John Doe" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Saved successfully");

    let records = store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(body["id"], records[0].id.to_string());
    assert_eq!(records[0].aadhaar_number, "123456789012");
    assert_eq!(records[0].entrepreneur_name, "John Doe");
    assert!(records[0].valid);
}

#[tokio::test]
async fn test_short_aadhaar_rejected() {
    let store = Arc::new(MemorySubmissionStore::new());
    let (status, body) = post_step1(
        store.clone(),
        json!({ "aadhaarNumber": "12345", "entrepreneurName": "John Doe" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(body["errors"]["aadhaarNumber"], "Invalid Aadhaar number");
    assert!(body["errors"].get("entrepreneurName").is_none());
    assert!(store.records().is_empty());
}

#[tokio::test]
async fn test_name_with_digit_rejected() {
    let (status, body) = post_step1(
        Arc::new(MemorySubmissionStore::new()),
        json!({ "aadhaarNumber": "123456789012", "entrepreneurName": "J0hn" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["entrepreneurName"], "Invalid name format");
    assert!(body["errors"].get("aadhaarNumber").is_none());
}

#[tokio::test]
async fn test_missing_members_count_as_empty() {
    let (status, body) = post_step1(Arc::new(MemorySubmissionStore::new()), json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["aadhaarNumber"], "Invalid Aadhaar number");
    assert_eq!(body["errors"]["entrepreneurName"], "Invalid name format");
}

#[tokio::test]
async fn test_unknown_members_ignored() {
    let (status, _) = post_step1(
        Arc::new(MemorySubmissionStore::new()),
        json!({
            "aadhaarNumber": "123456789012",
            "entrepreneurName": "A. K. Sharma",
            "ctl00_ContentPlaceHolder1_chkDecarationA": "on"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_non_string_member_counts_as_empty() {
    let (status, body) = post_step1(
        Arc::new(MemorySubmissionStore::new()),
        json!({ "aadhaarNumber": 123456789012u64, "entrepreneurName": "John Doe" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(body["errors"]["aadhaarNumber"], "Invalid Aadhaar number");
    assert!(body["errors"].get("entrepreneurName").is_none());
}

#[tokio::test]
async fn test_missing_content_type_gets_structured_400() {
    let (status, body) = post_raw(
        None,
        r#"{"aadhaarNumber":"123456789012","entrepreneurName":"John Doe"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(body["errors"]["aadhaarNumber"], "Invalid Aadhaar number");
    assert_eq!(body["errors"]["entrepreneurName"], "Invalid name format");
}

#[tokio::test]
async fn test_non_object_and_garbage_bodies_get_structured_400() {
    for raw in ["[1,2]", "\"123456789012\"", "not json", ""] {
        let (status, body) = post_raw(Some("application/json"), raw).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", raw);
        assert_eq!(body["errors"]["aadhaarNumber"], "Invalid Aadhaar number", "{}", raw);
        assert_eq!(body["errors"]["entrepreneurName"], "Invalid name format", "{}", raw);
    }
}

#[tokio::test]
async fn test_store_failure_is_internal_error() {
    let (status, body) = post_step1(
        Arc::new(FailingStore),
        json!({ "aadhaarNumber": "123456789012", "entrepreneurName": "John Doe" }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "message": "Internal server error" }));
}

#[tokio::test]
async fn test_each_save_gets_its_own_id() {
    let store = Arc::new(MemorySubmissionStore::new());
    let body = json!({ "aadhaarNumber": "123456789012", "entrepreneurName": "John Doe" });

    let (_, first) = post_step1(store.clone(), body.clone()).await;
    let (_, second) = post_step1(store.clone(), body).await;

    assert_ne!(first["id"], second["id"]);
    assert_eq!(store.records().len(), 2);
}

// ============================================================================
// Client against a live server
// ============================================================================

/// Serve `router` on an ephemeral port and return its base URL. The runtime
/// must outlive the requests.
fn spawn_server(runtime: &tokio::runtime::Runtime, router: axum::Router) -> String {
    let listener = runtime
        .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
        .unwrap();
    let addr = listener.local_addr().unwrap();
    runtime.spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{}", addr)
}

#[test]
fn http_client_reads_saved_and_rejected_replies() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let store = Arc::new(MemorySubmissionStore::new());
    let base = spawn_server(&runtime, build_router(AppState::new(store.clone())));
    let client = HttpSubmissionClient::new(&base);

    let mut payload = Map::new();
    payload.insert("aadhaarNumber".into(), json!("123456789012"));
    payload.insert("entrepreneurName".into(), json!("John Doe"));
    let reply = client.submit(&payload).unwrap();
    assert!(reply.accepted);
    assert_eq!(reply.message.as_deref(), Some("Saved successfully"));
    assert_eq!(store.records().len(), 1);

    payload.insert("aadhaarNumber".into(), json!(12345));
    let reply = client.submit(&payload).unwrap();
    assert!(!reply.accepted);
    assert_eq!(reply.message.as_deref(), Some("Validation failed"));
    assert_eq!(store.records().len(), 1);
}

#[test]
fn http_client_tolerates_plain_text_replies() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let router = axum::Router::new().route(
        "/api/udyam/step1",
        axum::routing::post(|| async { (StatusCode::BAD_GATEWAY, "upstream unavailable") }),
    );
    let base = spawn_server(&runtime, router);

    let reply = HttpSubmissionClient::new(&base).submit(&Map::new()).unwrap();
    assert!(!reply.accepted);
    assert!(reply.message.is_none());
}

// ============================================================================
// Validation rules
// ============================================================================

#[test]
fn test_aadhaar_must_be_twelve_ascii_digits() {
    assert!(validate_step1(&submission(Some("123456789012"), Some("Jo"))).is_ok());

    for bad in ["12345678901", "1234567890123", "12345678901a", "１２３４５６７８９０１２", ""] {
        let err = validate_step1(&submission(Some(bad), Some("Jo"))).unwrap_err();
        assert_eq!(err.get("aadhaarNumber"), Some("Invalid Aadhaar number"), "{}", bad);
    }
}

#[test]
fn test_name_pattern_bounds() {
    let ok = |name: &str| validate_step1(&submission(Some("123456789012"), Some(name))).is_ok();

    assert!(ok("Jo"));
    assert!(ok("Dr. A K Sharma"));
    assert!(ok(&"a".repeat(100)));
    assert!(!ok("J"));
    assert!(!ok(&"a".repeat(101)));
    assert!(!ok("O'Brien"));
    assert!(!ok("Anne-Marie"));
}

#[test]
fn submission_members_read_from_any_json() {
    let body = json!({ "aadhaarNumber": 1, "entrepreneurName": "Asha", "extra": true });
    assert_eq!(
        Step1Submission::from_value(&body),
        submission(None, Some("Asha"))
    );
    assert_eq!(Step1Submission::from_value(&json!([1, 2])), submission(None, None));
}

#[test]
fn test_both_failures_reported_together() {
    let err = validate_step1(&submission(None, None)).unwrap_err();
    assert_eq!(err.errors.len(), 2);
}

// ============================================================================
// Stores and startup checks
// ============================================================================

#[test]
fn test_jsonl_store_appends_records() {
    let path = common::temp_path("submissions.jsonl");
    let store = JsonlSubmissionStore::open(&path).unwrap();

    let valid = validate_step1(&submission(Some("123456789012"), Some("John Doe"))).unwrap();
    let saved = store.insert(SubmissionRecord::accepted(valid.clone())).unwrap();
    store.insert(SubmissionRecord::accepted(valid)).unwrap();

    let lines: Vec<SubmissionRecord> = std::fs::read_to_string(store.path())
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], saved);

    let raw: Value = serde_json::from_str(
        std::fs::read_to_string(&path).unwrap().lines().next().unwrap(),
    )
    .unwrap();
    assert!(raw.get("aadhaarNumber").is_some());
    assert!(raw.get("createdAt").is_some());

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_schema_cross_check() {
    let mut doc = common::udyam_document();
    let fields = form_mirror::extract::fields::extract_fields(&mut doc).unwrap();
    let rules = form_mirror::extract::rules::extract_validation_rules(&mut doc).unwrap();
    let structure = form_mirror::extract::structure::extract_structure(&mut doc).unwrap();
    let mut schema = form_mirror::schema::assembler::assemble(fields, rules, structure);

    assert!(check_schema(&schema).is_empty());

    schema.fields.retain(|f| f.id != common::NAME_ID);
    assert_eq!(check_schema(&schema), vec![common::NAME_ID]);
}
