// Store map downloader.
//
// The real map endpoint, its authentication and its response schema have not
// been discovered yet. Fetching goes through `MapFetcher` so the placeholder
// can be swapped for a configured HTTP endpoint without touching the rest.

use crate::error::{Error, Result};
use crate::layout::ensure_dir;
use crate::model::ClassifiedEndpoint;
use crate::report::load_report;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Path fragments that single out a map endpoint among the analysis results
pub const MAP_ENDPOINT_KEYWORDS: &[&str] = &["map", "layout", "store"];

pub const PLACEHOLDER_NOTE: &str =
    "This is placeholder data - update after capturing real API response";

/// API settings recovered from a previous analysis run
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub analysis_file: PathBuf,
    pub api_base: String,
    pub example_endpoint: ClassifiedEndpoint,
}

/// Newest `analysis_*.json` in `dir` by modification time, file name breaking ties
pub fn latest_analysis_file(dir: &Path) -> Result<PathBuf> {
    if !dir.is_dir() {
        return Err(Error::ConfigurationMissing(format!(
            "no analysis results found in {}",
            dir.display()
        )));
    }

    let mut candidates = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with("analysis_") && name.ends_with(".json") {
            let modified = entry.metadata()?.modified()?;
            candidates.push((modified, name, entry.path()));
        }
    }

    candidates
        .into_iter()
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
        .map(|(_, _, path)| path)
        .ok_or_else(|| {
            Error::ConfigurationMissing(format!("no analysis files found in {}", dir.display()))
        })
}

/// First endpoint whose path looks like map data
pub fn select_map_endpoint(endpoints: &[ClassifiedEndpoint]) -> Option<&ClassifiedEndpoint> {
    endpoints.iter().find(|endpoint| {
        let path = endpoint.path.to_lowercase();
        MAP_ENDPOINT_KEYWORDS.iter().any(|k| path.contains(k))
    })
}

pub fn load_api_config(analysis_dir: &Path) -> Result<ApiConfig> {
    let analysis_file = latest_analysis_file(analysis_dir)?;
    info!("Loading API config from {}", analysis_file.display());

    let report = load_report(&analysis_file)?;
    if report.interesting_endpoints.is_empty() {
        return Err(Error::ConfigurationMissing(format!(
            "no interesting endpoints in {}",
            analysis_file.display()
        )));
    }

    let endpoint = select_map_endpoint(&report.interesting_endpoints).ok_or_else(|| {
        Error::ConfigurationMissing(format!(
            "no map, layout or store endpoint in {}",
            analysis_file.display()
        ))
    })?;

    Ok(ApiConfig {
        api_base: endpoint.domain.clone(),
        example_endpoint: endpoint.clone(),
        analysis_file,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl FromStr for Coordinates {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidCoordinates(s.to_string());

        let (lat, lng) = s.split_once(',').ok_or_else(invalid)?;
        let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
        let lng: f64 = lng.trim().parse().map_err(|_| invalid())?;

        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(invalid());
        }
        Ok(Coordinates { lat, lng })
    }
}

/// Decide which store to download. Only explicit store IDs resolve for now.
pub fn resolve_store(store_id: Option<&str>, coordinates: Option<Coordinates>) -> Result<String> {
    if let Some(id) = store_id.map(str::trim).filter(|id| !id.is_empty()) {
        return Ok(id.to_string());
    }

    match coordinates {
        Some(c) => Err(Error::NoTarget(format!(
            "store lookup by coordinates ({}, {}) is not implemented yet",
            c.lat, c.lng
        ))),
        None => Err(Error::NoTarget("no store ID or coordinates provided".to_string())),
    }
}

/// Placeholder request headers. Authentication headers get added here once
/// they are known from a captured session.
pub fn default_headers() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("User-Agent".to_string(), "Target/Android".to_string()),
        ("Accept".to_string(), "application/json".to_string()),
        ("Content-Type".to_string(), "application/json".to_string()),
    ])
}

/// Parse a `Name: Value` header argument
pub fn parse_header(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| Error::InvalidHeader(raw.to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidHeader(raw.to_string()));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[derive(Debug, Clone)]
pub struct MapRequest {
    pub store_id: String,
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPayload {
    /// "unknown" until the real format (GeoJSON, SVG, vector tiles...) is known
    pub format: String,
    pub data: Value,
}

pub trait MapFetcher {
    fn describe(&self) -> String;

    fn fetch(&self, request: &MapRequest) -> impl Future<Output = Result<MapPayload>> + Send;
}

/// Returns an empty map of unknown format
pub struct PlaceholderFetcher;

impl MapFetcher for PlaceholderFetcher {
    fn describe(&self) -> String {
        "placeholder (no map endpoint configured)".to_string()
    }

    async fn fetch(&self, request: &MapRequest) -> Result<MapPayload> {
        debug!("Returning placeholder map for store {}", request.store_id);
        Ok(MapPayload {
            format: "unknown".to_string(),
            data: Value::Null,
        })
    }
}

/// GETs a configured endpoint; `{store_id}` in the template is substituted
pub struct HttpFetcher {
    client: Client,
    template: String,
}

impl HttpFetcher {
    pub fn new(template: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self {
            client,
            template: template.to_string(),
        })
    }

    pub fn endpoint_url(&self, store_id: &str) -> String {
        self.template.replace("{store_id}", store_id)
    }
}

impl MapFetcher for HttpFetcher {
    fn describe(&self) -> String {
        self.template.clone()
    }

    async fn fetch(&self, request: &MapRequest) -> Result<MapPayload> {
        let url = self.endpoint_url(&request.store_id);
        info!("Fetching store map from {}", url);

        let mut builder = self.client.get(&url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?.error_for_status()?;
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response.text().await?;

        let is_json = content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("json"));
        let payload = match serde_json::from_str::<Value>(&body) {
            Ok(data) if is_json || content_type.is_none() => MapPayload {
                format: "json".to_string(),
                data,
            },
            _ => MapPayload {
                format: content_type.unwrap_or_else(|| "unknown".to_string()),
                data: Value::String(body),
            },
        };
        Ok(payload)
    }
}

/// Fetch with a spinner, the way long-running CLI steps report progress
pub async fn download_map<F: MapFetcher>(
    fetcher: &F,
    request: &MapRequest,
    show_progress: bool,
) -> Result<MapPayload> {
    let spinner = if show_progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Fetching store map data...");
        Some(pb)
    } else {
        None
    };

    let result = fetcher.fetch(request).await;

    if let Some(pb) = spinner {
        match result {
            Ok(_) => pb.finish_with_message("✓ Complete"),
            Err(_) => pb.finish_and_clear(),
        }
    }
    result
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSource {
    pub api_base: String,
    pub example_url: String,
    pub analysis_file: String,
    pub fetcher: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapMetadata {
    pub floors: Vec<Value>,
    pub sections: Vec<Value>,
    pub aisles: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapDocument {
    pub store_id: String,
    pub downloaded_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub source: MapSource,
    pub map: MapPayload,
    pub metadata: MapMetadata,
}

impl MapDocument {
    pub fn new(store_id: &str, api: &ApiConfig, fetcher: String, map: MapPayload) -> Self {
        let note = (map.data.is_null()).then(|| PLACEHOLDER_NOTE.to_string());
        Self {
            store_id: store_id.to_string(),
            downloaded_at: chrono::Local::now().to_rfc3339(),
            note,
            source: MapSource {
                api_base: api.api_base.clone(),
                example_url: api.example_endpoint.url.clone(),
                analysis_file: api.analysis_file.display().to_string(),
                fetcher,
            },
            map,
            metadata: MapMetadata::default(),
        }
    }
}

/// Store IDs end up in file names
fn file_safe(store_id: &str) -> String {
    store_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// (`store_<id>_<timestamp>.json`, `store_<id>_latest.json`)
pub fn map_file_names(store_id: &str, timestamp: &str) -> (String, String) {
    let id = file_safe(store_id);
    (
        format!("store_{}_{}.json", id, timestamp),
        format!("store_{}_latest.json", id),
    )
}

/// Write the map and refresh the `latest` copy. Returns the timestamped path.
pub fn save_map(document: &MapDocument, dir: &Path, timestamp: &str) -> Result<PathBuf> {
    ensure_dir(dir)?;
    let (file_name, latest_name) = map_file_names(&document.store_id, timestamp);
    let path = dir.join(file_name);

    let mut json =
        serde_json::to_string_pretty(document).map_err(|e| Error::Serialize("store map", e))?;
    json.push('\n');
    fs::write(&path, &json)?;
    fs::write(dir.join(latest_name), &json)?;

    info!("Saved store map to {}", path.display());
    Ok(path)
}
