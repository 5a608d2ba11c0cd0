// Live capture session: polls the proxy web UI flow list and buffers
// requests until the user stops the capture.

use crate::classify::KeywordMatcher;
use crate::error::{Error, Result};
use crate::layout::ensure_dir;
use crate::model::{CapturedRequest, Header, ResponseContent};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Session file layout; readable again by capture ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDocument {
    pub capture_time: String,
    pub total_requests: usize,
    pub requests: Vec<CapturedRequest>,
}

/// Default session file name for a capture started at `now`
pub fn default_session_name(now: chrono::DateTime<chrono::Local>) -> String {
    format!("session_{}.json", now.format("%Y%m%d_%H%M%S"))
}

/// One entry of the mitmweb `/flows` listing. Non-HTTP flows have no request.
#[derive(Debug, Clone, Deserialize)]
pub struct Flow {
    pub id: String,
    #[serde(default)]
    pub request: Option<FlowRequest>,
    #[serde(default)]
    pub response: Option<FlowResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlowRequest {
    pub method: String,
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub path: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlowResponse {
    pub status_code: u16,
    #[serde(rename = "contentLength", default)]
    pub content_length: Option<i64>,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

impl FlowRequest {
    pub fn url(&self) -> String {
        let default_port = match self.scheme.as_str() {
            "https" => 443,
            "http" => 80,
            _ => 0,
        };
        if self.port == default_port {
            format!("{}://{}{}", self.scheme, self.host, self.path)
        } else {
            format!("{}://{}:{}{}", self.scheme, self.host, self.port, self.path)
        }
    }
}

impl Flow {
    pub fn to_request(&self) -> Option<CapturedRequest> {
        let request = self.request.as_ref()?;

        let mut captured = CapturedRequest::new(&request.method, &request.url());
        captured.headers = request
            .headers
            .iter()
            .map(|(name, value)| Header {
                name: name.clone(),
                value: value.clone(),
            })
            .collect();

        if let Some(ref response) = self.response {
            captured.status = response.status_code;
            captured.response_size = response.content_length.unwrap_or(0);
            captured.response_content = ResponseContent {
                size: response.content_length,
                mime_type: response
                    .headers
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
                    .map(|(_, value)| value.clone()),
                ..ResponseContent::default()
            };
        }

        Some(captured)
    }
}

/// Request buffer for a running capture
pub struct CaptureSession {
    matcher: KeywordMatcher,
    /// Flow id to its index in `requests`
    seen: HashMap<String, usize>,
    requests: Vec<CapturedRequest>,
    interesting: usize,
}

impl CaptureSession {
    pub fn new(matcher: KeywordMatcher) -> Self {
        Self {
            matcher,
            seen: HashMap::new(),
            requests: Vec::new(),
            interesting: 0,
        }
    }

    /// Buffer flows not seen before. A known flow whose response arrived
    /// since the last poll replaces its earlier record. Returns how many
    /// flows were added.
    pub fn ingest_flows(&mut self, flows: &[Flow]) -> usize {
        let mut added = 0;
        for flow in flows {
            if let Some(&index) = self.seen.get(&flow.id) {
                if flow.response.is_some()
                    && self.requests[index].status == 0
                    && let Some(request) = flow.to_request()
                {
                    debug!("Flow {} completed with status {}", flow.id, request.status);
                    self.requests[index] = request;
                }
                continue;
            }
            let Some(request) = flow.to_request() else {
                debug!("Skipping non-HTTP flow {}", flow.id);
                continue;
            };
            self.seen.insert(flow.id.clone(), self.requests.len());
            if self.matcher.matches_url(&request.url) {
                self.interesting += 1;
            }
            self.requests.push(request);
            added += 1;
        }
        added
    }

    pub fn total(&self) -> usize {
        self.requests.len()
    }

    pub fn interesting(&self) -> usize {
        self.interesting
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn requests(&self) -> &[CapturedRequest] {
        &self.requests
    }

    pub fn to_document(&self, capture_time: String) -> SessionDocument {
        SessionDocument {
            capture_time,
            total_requests: self.requests.len(),
            requests: self.requests.clone(),
        }
    }

    /// Write the buffer as `<dir>/<file_name>`
    pub fn save(&self, dir: &Path, file_name: &str) -> Result<PathBuf> {
        ensure_dir(dir)?;
        let path = dir.join(file_name);
        let document = self.to_document(chrono::Local::now().to_rfc3339());

        let mut json = serde_json::to_string_pretty(&document)
            .map_err(|e| Error::Serialize("capture session", e))?;
        json.push('\n');
        fs::write(&path, json)?;

        info!("Saved {} requests to {}", self.total(), path.display());
        Ok(path)
    }
}

/// Client for the mitmweb flow listing
pub struct FlowClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl FlowClient {
    pub fn new(host: &str, web_port: u16) -> Result<Self> {
        Self::with_base_url(&format!("http://{}:{}", host, web_port))
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("aislemap/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Newer mitmweb releases require the token printed at startup
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub async fn fetch_flows(&self) -> Result<Vec<Flow>> {
        let url = format!("{}/flows", self.base_url);
        debug!("Polling {}", url);

        let mut request = self.client.get(&url);
        if let Some(ref token) = self.token {
            request = request.query(&[("token", token)]);
        }

        let listing = request
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Value>>()
            .await?;
        Ok(parse_flow_listing(listing))
    }
}

/// Keep the listing entries that read as flows. Entries of other shapes
/// (DNS flows carry a different `request` object) are skipped.
pub fn parse_flow_listing(listing: Vec<Value>) -> Vec<Flow> {
    listing
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<Flow>(entry) {
            Ok(flow) => Some(flow),
            Err(e) => {
                debug!("Skipping unreadable flow: {}", e);
                None
            }
        })
        .collect()
}
