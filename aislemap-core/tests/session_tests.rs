// Tests for live capture sessions and mitmweb flow polling

use aislemap_core::classify::KeywordMatcher;
use aislemap_core::ingest::{CaptureFormat, load_capture};
use aislemap_core::session::{
    CaptureSession, Flow, FlowClient, default_session_name, parse_flow_listing,
};
use chrono::TimeZone;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn flows_json() -> serde_json::Value {
    json!([
        {
            "id": "f1",
            "type": "http",
            "request": {
                "method": "GET",
                "scheme": "https",
                "host": "api.target.com",
                "port": 443,
                "path": "/stores/v1/1375/map?floor=1",
                "http_version": "HTTP/2.0",
                "headers": [["accept", "application/json"], ["x-api-key", "abc"]],
                "contentLength": 0
            },
            "response": {
                "http_version": "HTTP/2.0",
                "status_code": 200,
                "reason": "OK",
                "headers": [["Content-Type", "application/json"]],
                "contentLength": 5120
            }
        },
        {
            "id": "f2",
            "type": "http",
            "request": {
                "method": "POST",
                "scheme": "http",
                "host": "10.0.2.2",
                "port": 8000,
                "path": "/login",
                "headers": []
            }
        },
        {
            "id": "t1",
            "type": "tcp"
        }
    ])
}

fn parse_flows() -> Vec<Flow> {
    serde_json::from_value(flows_json()).unwrap()
}

// ============================================================================
// Flow Conversion Tests
// ============================================================================

#[test]
fn test_flow_to_request_default_port() {
    let flows = parse_flows();
    let request = flows[0].to_request().unwrap();

    assert_eq!(request.method, "GET");
    assert_eq!(request.url, "https://api.target.com/stores/v1/1375/map?floor=1");
    assert_eq!(request.headers.len(), 2);
    assert_eq!(request.headers[1].name, "x-api-key");
    assert_eq!(request.status, 200);
    assert_eq!(request.response_size, 5120);
    assert_eq!(
        request.response_content.mime_type.as_deref(),
        Some("application/json")
    );
}

#[test]
fn test_flow_to_request_explicit_port_without_response() {
    let flows = parse_flows();
    let request = flows[1].to_request().unwrap();

    assert_eq!(request.url, "http://10.0.2.2:8000/login");
    assert_eq!(request.status, 0);
    assert_eq!(request.response_size, 0);
}

#[test]
fn test_non_http_flow_has_no_request() {
    let flows = parse_flows();
    assert!(flows[2].to_request().is_none());
}

// ============================================================================
// Session Buffer Tests
// ============================================================================

#[test]
fn test_session_deduplicates_flows() {
    let flows = parse_flows();
    let mut session = CaptureSession::new(KeywordMatcher::default());

    assert_eq!(session.ingest_flows(&flows), 2);
    assert_eq!(session.ingest_flows(&flows), 0);
    assert_eq!(session.total(), 2);
    assert_eq!(session.interesting(), 1);
}

#[test]
fn test_session_fills_in_late_response() {
    let pending: Vec<Flow> = serde_json::from_value(json!([{
        "id": "f1",
        "type": "http",
        "request": {
            "method": "GET", "scheme": "https", "host": "api.target.com",
            "port": 443, "path": "/stores/v1/1375/layout", "headers": []
        }
    }]))
    .unwrap();
    let completed: Vec<Flow> = serde_json::from_value(json!([{
        "id": "f1",
        "type": "http",
        "request": {
            "method": "GET", "scheme": "https", "host": "api.target.com",
            "port": 443, "path": "/stores/v1/1375/layout", "headers": []
        },
        "response": {"status_code": 200, "headers": [], "contentLength": 4096}
    }]))
    .unwrap();
    let mut session = CaptureSession::new(KeywordMatcher::default());

    assert_eq!(session.ingest_flows(&pending), 1);
    assert_eq!(session.requests()[0].status, 0);

    assert_eq!(session.ingest_flows(&completed), 0);
    assert_eq!(session.total(), 1);
    assert_eq!(session.interesting(), 1);
    assert_eq!(session.requests()[0].status, 200);
    assert_eq!(session.requests()[0].response_size, 4096);

    // a later poll never downgrades a completed record
    session.ingest_flows(&pending);
    assert_eq!(session.requests()[0].status, 200);
}

#[test]
fn test_session_save_is_ingestible() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("captured");
    let mut session = CaptureSession::new(KeywordMatcher::default());
    session.ingest_flows(&parse_flows());

    let path = session.save(&dir, "session_test.json").unwrap();
    let capture = load_capture(&path).unwrap();

    assert_eq!(capture.format, CaptureFormat::Session);
    assert_eq!(capture.requests, session.requests());

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["total_requests"], 2);
    assert!(written["capture_time"].is_string());
}

#[test]
fn test_empty_session() {
    let session = CaptureSession::new(KeywordMatcher::default());
    assert!(session.is_empty());
    assert_eq!(session.to_document("t".to_string()).total_requests, 0);
}

#[test]
fn test_default_session_name() {
    let now = chrono::Local
        .with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
        .single()
        .unwrap();
    assert_eq!(default_session_name(now), "session_20240309_140507.json");
}

// ============================================================================
// Flow Client Tests
// ============================================================================

#[tokio::test]
async fn test_fetch_flows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flows"))
        .respond_with(ResponseTemplate::new(200).set_body_json(flows_json()))
        .mount(&server)
        .await;

    let client = FlowClient::with_base_url(&server.uri()).unwrap();
    let flows = client.fetch_flows().await.unwrap();

    assert_eq!(flows.len(), 3);
    assert_eq!(flows[0].id, "f1");
}

#[test]
fn test_parse_flow_listing_skips_unreadable_entries() {
    let mut listing: Vec<serde_json::Value> = flows_json().as_array().unwrap().clone();
    listing.push(json!({
        "id": "d1",
        "type": "dns",
        "request": {"id": 1, "query": true, "questions": [{"name": "api.target.com"}]}
    }));

    let flows = parse_flow_listing(listing);

    assert_eq!(flows.len(), 3);
    assert!(flows.iter().all(|f| f.id != "d1"));
}

#[tokio::test]
async fn test_fetch_flows_with_dns_flow() {
    let server = MockServer::start().await;
    let mut listing = flows_json();
    listing.as_array_mut().unwrap().push(json!({
        "id": "d1",
        "type": "dns",
        "request": {"id": 1, "query": true, "op_code": "QUERY"}
    }));
    Mock::given(method("GET"))
        .and(path("/flows"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing))
        .mount(&server)
        .await;

    let client = FlowClient::with_base_url(&server.uri()).unwrap();
    let flows = client.fetch_flows().await.unwrap();

    let mut session = CaptureSession::new(KeywordMatcher::default());
    assert_eq!(session.ingest_flows(&flows), 2);
    assert_eq!(session.interesting(), 1);
}

#[tokio::test]
async fn test_fetch_flows_sends_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flows"))
        .and(query_param("token", "s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = FlowClient::with_base_url(&format!("{}/", server.uri()))
        .unwrap()
        .with_token(Some("s3cret".to_string()));

    assert!(client.fetch_flows().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_fetch_flows_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flows"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let client = FlowClient::with_base_url(&server.uri()).unwrap();
    assert!(client.fetch_flows().await.is_err());
}
