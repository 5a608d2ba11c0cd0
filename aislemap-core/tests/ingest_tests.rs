// Tests for capture ingestion

use aislemap_core::Error;
use aislemap_core::ingest::{CaptureFormat, detect_format, load_capture, parse_capture};
use std::fs;
use tempfile::TempDir;

const HAR_CAPTURE: &str = r#"{
  "log": {
    "version": "1.2",
    "entries": [
      {
        "request": {
          "method": "GET",
          "url": "https://api.target.com/stores/v1/1375/layout?floor=1",
          "headers": [{"name": "Accept", "value": "application/json"}]
        },
        "response": {
          "status": 200,
          "bodySize": 2048,
          "content": {"size": 2048, "mimeType": "application/json", "text": "{\"aisles\": []}"}
        }
      },
      {
        "request": {"method": "POST", "url": "https://analytics.example.com/collect"},
        "response": {"status": 204, "bodySize": -1, "content": {"size": 0}}
      },
      {
        "request": {"method": "GET", "url": "https://api.target.com/profile"}
      }
    ]
  }
}"#;

// ============================================================================
// HAR Tests
// ============================================================================

#[test]
fn test_parse_har_one_request_per_entry() {
    let (format, requests) = parse_capture(HAR_CAPTURE).unwrap();

    assert_eq!(format, CaptureFormat::Har);
    assert_eq!(requests.len(), 3);
}

#[test]
fn test_parse_har_preserves_order_and_fields() {
    let (_, requests) = parse_capture(HAR_CAPTURE).unwrap();

    assert_eq!(requests[0].method, "GET");
    assert_eq!(
        requests[0].url,
        "https://api.target.com/stores/v1/1375/layout?floor=1"
    );
    assert_eq!(requests[0].headers.len(), 1);
    assert_eq!(requests[0].headers[0].name, "Accept");
    assert_eq!(requests[0].status, 200);
    assert_eq!(requests[0].response_size, 2048);
    assert_eq!(
        requests[0].response_content.mime_type.as_deref(),
        Some("application/json")
    );
    assert_eq!(
        requests[0].response_content.text.as_deref(),
        Some("{\"aisles\": []}")
    );

    assert_eq!(requests[1].method, "POST");
    assert_eq!(requests[1].response_size, -1);
}

#[test]
fn test_parse_har_missing_response_defaults() {
    let (_, requests) = parse_capture(HAR_CAPTURE).unwrap();

    assert_eq!(requests[2].status, 0);
    assert_eq!(requests[2].response_size, 0);
    assert!(requests[2].headers.is_empty());
    assert!(requests[2].response_content.text.is_none());
}

#[test]
fn test_parse_har_empty_entries() {
    let (format, requests) = parse_capture(r#"{"log": {"entries": []}}"#).unwrap();
    assert_eq!(format, CaptureFormat::Har);
    assert!(requests.is_empty());
}

#[test]
fn test_parse_har_entry_without_url_is_unknown_format() {
    let result = parse_capture(r#"{"log": {"entries": [{"request": {"method": "GET"}}]}}"#);
    assert!(matches!(result, Err(Error::UnknownFormat(_))));
}

// ============================================================================
// Session Format Tests
// ============================================================================

#[test]
fn test_parse_session_shape() {
    let content = r#"{"requests":[{"method":"GET","url":"https://api.example.com/v1/store/42/layout","status":200,"response_size":120}]}"#;
    let (format, requests) = parse_capture(content).unwrap();

    assert_eq!(format, CaptureFormat::Session);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].status, 200);
    assert_eq!(requests[0].response_size, 120);
}

#[test]
fn test_parse_session_empty_requests() {
    let (format, requests) = parse_capture(r#"{"requests": []}"#).unwrap();
    assert_eq!(format, CaptureFormat::Session);
    assert!(requests.is_empty());
}

#[test]
fn test_parse_session_with_extra_fields() {
    let content = r#"{
        "capture_time": "2024-01-01T10:00:00",
        "total_requests": 1,
        "requests": [{"method": "GET", "url": "https://x.example.com/a", "response_content": {}}]
    }"#;
    let (_, requests) = parse_capture(content).unwrap();
    assert_eq!(requests.len(), 1);
}

#[test]
fn test_har_wins_over_requests() {
    let value = serde_json::json!({"log": {"entries": []}, "requests": []});
    assert_eq!(detect_format(&value), Some(CaptureFormat::Har));
}

// ============================================================================
// Failure Tests
// ============================================================================

#[test]
fn test_parse_invalid_json() {
    let result = parse_capture("{ not json");
    assert!(matches!(result, Err(Error::InvalidJson(_))));
}

#[test]
fn test_parse_unrecognized_object() {
    let result = parse_capture(r#"{"flows": []}"#);
    assert!(matches!(result, Err(Error::UnknownFormat(_))));
}

#[test]
fn test_parse_top_level_array_is_unknown() {
    let result = parse_capture(r#"[{"method": "GET", "url": "https://a.example.com/"}]"#);
    assert!(matches!(result, Err(Error::UnknownFormat(_))));
}

#[test]
fn test_parse_requests_not_an_array() {
    let result = parse_capture(r#"{"requests": {"method": "GET"}}"#);
    assert!(matches!(result, Err(Error::UnknownFormat(_))));
}

#[test]
fn test_load_capture_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("missing.har");

    let result = load_capture(&path);
    assert!(matches!(result, Err(Error::NotFound(p)) if p == path));
}

#[test]
fn test_load_capture_from_disk() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("session.har");
    fs::write(&path, HAR_CAPTURE).unwrap();

    let capture = load_capture(&path).unwrap();
    assert_eq!(capture.path, path);
    assert_eq!(capture.format, CaptureFormat::Har);
    assert_eq!(capture.requests.len(), 3);
}
