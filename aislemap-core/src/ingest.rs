// Capture file ingestion: HAR archives and session files

use crate::error::{Error, Result};
use crate::model::{CapturedRequest, Header, ResponseContent};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFormat {
    /// HTTP Archive: `log.entries[]`
    Har,
    /// Object with a top-level `requests` array in the internal record shape
    Session,
}

impl CaptureFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureFormat::Har => "HAR",
            CaptureFormat::Session => "session JSON",
        }
    }
}

/// A loaded capture file
#[derive(Debug, Clone)]
pub struct Capture {
    pub path: PathBuf,
    pub format: CaptureFormat,
    pub requests: Vec<CapturedRequest>,
}

#[derive(Deserialize)]
struct HarDocument {
    log: HarLog,
}

#[derive(Deserialize)]
struct HarLog {
    entries: Vec<HarEntry>,
}

#[derive(Deserialize)]
struct HarEntry {
    request: HarRequest,
    #[serde(default)]
    response: Option<HarResponse>,
}

#[derive(Deserialize)]
struct HarRequest {
    method: String,
    url: String,
    #[serde(default)]
    headers: Vec<Header>,
}

#[derive(Deserialize, Default)]
struct HarResponse {
    #[serde(default)]
    status: u16,
    #[serde(rename = "bodySize", default)]
    body_size: i64,
    #[serde(default)]
    content: ResponseContent,
}

impl From<HarEntry> for CapturedRequest {
    fn from(entry: HarEntry) -> Self {
        let response = entry.response.unwrap_or_default();
        CapturedRequest {
            method: entry.request.method,
            url: entry.request.url,
            headers: entry.request.headers,
            status: response.status,
            response_size: response.body_size,
            response_content: response.content,
        }
    }
}

/// Load and normalize a capture file
pub fn load_capture(path: &Path) -> Result<Capture> {
    if !path.exists() {
        return Err(Error::NotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path)?;
    let (format, requests) = parse_capture(&content)?;
    info!(
        "Loaded {} requests from {} ({})",
        requests.len(),
        path.display(),
        format.as_str()
    );

    Ok(Capture {
        path: path.to_path_buf(),
        format,
        requests,
    })
}

/// Parse capture file contents. Request order follows the source.
pub fn parse_capture(content: &str) -> Result<(CaptureFormat, Vec<CapturedRequest>)> {
    let value: Value = serde_json::from_str(content)?;

    let format = detect_format(&value).ok_or_else(|| {
        Error::UnknownFormat(
            "expected a HAR `log.entries` array or a top-level `requests` array".to_string(),
        )
    })?;
    debug!("Detected capture format: {}", format.as_str());

    let requests = match format {
        CaptureFormat::Har => {
            let document: HarDocument = serde_json::from_value(value)
                .map_err(|e| Error::UnknownFormat(format!("malformed HAR entry: {}", e)))?;
            document
                .log
                .entries
                .into_iter()
                .map(CapturedRequest::from)
                .collect()
        }
        CaptureFormat::Session => {
            let requests = value
                .get("requests")
                .cloned()
                .unwrap_or_else(|| Value::Array(Vec::new()));
            serde_json::from_value::<Vec<CapturedRequest>>(requests)
                .map_err(|e| Error::UnknownFormat(format!("malformed request record: {}", e)))?
        }
    };

    Ok((format, requests))
}

/// HAR wins when a document carries both shapes
pub fn detect_format(value: &Value) -> Option<CaptureFormat> {
    if value
        .get("log")
        .and_then(|log| log.get("entries"))
        .is_some_and(Value::is_array)
    {
        Some(CaptureFormat::Har)
    } else if value.get("requests").is_some_and(Value::is_array) {
        Some(CaptureFormat::Session)
    } else {
        None
    }
}
