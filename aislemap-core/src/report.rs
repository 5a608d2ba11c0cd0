// Analysis report: the JSON written per capture plus console renderings

use crate::classify::{DomainSummary, domain_summaries};
use crate::error::{Error, Result};
use crate::layout::ensure_dir;
use crate::model::{CapturedRequest, ClassifiedEndpoint, ResponseContent};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Rows shown in the console table; the file always has everything
pub const TABLE_ROW_LIMIT: usize = 20;
pub const PATH_DISPLAY_WIDTH: usize = 60;
pub const PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub analyzed_file: String,
    pub analyzed_at: String,
    pub total_requests: usize,
    pub interesting_count: usize,
    pub domains: BTreeMap<String, DomainSummary>,
    pub interesting_endpoints: Vec<ClassifiedEndpoint>,
}

impl AnalysisReport {
    pub fn new(
        analyzed_file: &Path,
        requests: &[CapturedRequest],
        interesting_endpoints: Vec<ClassifiedEndpoint>,
    ) -> Self {
        Self {
            analyzed_file: analyzed_file.display().to_string(),
            analyzed_at: chrono::Utc::now().to_rfc3339(),
            total_requests: requests.len(),
            interesting_count: interesting_endpoints.len(),
            domains: domain_summaries(requests, &interesting_endpoints),
            interesting_endpoints,
        }
    }
}

/// `analysis_<stem>.json` for a capture file
pub fn report_file_name(capture: &Path) -> String {
    let stem = capture
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "capture".to_string());
    format!("analysis_{}.json", stem)
}

/// Write the report into `dir`, creating it if needed. Returns the file path.
pub fn save_report(report: &AnalysisReport, capture: &Path, dir: &Path) -> Result<PathBuf> {
    ensure_dir(dir)?;
    let path = dir.join(report_file_name(capture));

    let mut json =
        serde_json::to_string_pretty(report).map_err(|e| Error::Serialize("analysis report", e))?;
    json.push('\n');
    fs::write(&path, json)?;

    info!("Saved analysis report to {}", path.display());
    Ok(path)
}

pub fn load_report(path: &Path) -> Result<AnalysisReport> {
    if !path.exists() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Shorten a path to `max` characters, marking the cut with `...`
pub fn truncate_path(path: &str, max: usize) -> String {
    if path.chars().count() > max {
        let head: String = path.chars().take(max).collect();
        format!("{}...", head)
    } else {
        path.to_string()
    }
}

pub fn generate_domain_breakdown(report: &AnalysisReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Found {} domain(s):\n",
        report.domains.len().to_string().green().bold()
    ));
    for (domain, summary) in &report.domains {
        let name = if domain.is_empty() { "(no host)" } else { domain };
        out.push_str(&format!(
            "  • {} ({} requests, {} interesting)\n",
            name,
            summary.requests,
            summary.interesting
        ));
    }
    out
}

pub fn generate_endpoint_table(endpoints: &[ClassifiedEndpoint]) -> String {
    let mut out = String::new();
    let rule = "─".repeat(8 + PATH_DISPLAY_WIDTH + 3 + 8 + 16);

    out.push_str(&format!("{}\n", "Potential Store Map Endpoints".bold()));
    out.push_str(&format!("{}\n", rule));
    out.push_str(&format!(
        "{:<8}{:<w$}{:>8}{:>16}\n",
        "Method",
        "Path",
        "Status",
        "Size",
        w = PATH_DISPLAY_WIDTH + 3
    ));
    out.push_str(&format!("{}\n", rule));

    for endpoint in endpoints.iter().take(TABLE_ROW_LIMIT) {
        let method = format!("{:<8}", endpoint.method);
        let path = format!(
            "{:<w$}",
            truncate_path(&endpoint.path, PATH_DISPLAY_WIDTH),
            w = PATH_DISPLAY_WIDTH + 3
        );
        let status = format!("{:>8}", endpoint.status);
        let size = format!("{:>16}", format!("{} bytes", endpoint.response_size));

        let status = match endpoint.status {
            200..=299 => status.green(),
            300..=399 => status.cyan(),
            400..=499 => status.yellow(),
            500..=599 => status.red(),
            _ => status.normal(),
        };

        out.push_str(&format!(
            "{}{}{}{}\n",
            method.cyan(),
            path.magenta(),
            status,
            size.yellow()
        ));
    }

    if endpoints.len() > TABLE_ROW_LIMIT {
        out.push_str(&format!(
            "{}\n",
            format!(
                "  ... {} more in the report file",
                endpoints.len() - TABLE_ROW_LIMIT
            )
            .dimmed()
        ));
    }
    out.push_str(&format!("{}\n", rule));
    out
}

/// First [`PREVIEW_CHARS`] characters of the response body, pretty-printed
/// when the body is JSON
pub fn response_preview(content: &ResponseContent) -> Option<String> {
    let text = content.text.as_deref().filter(|t| !t.trim().is_empty())?;

    let rendered = serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| text.to_string());

    Some(rendered.chars().take(PREVIEW_CHARS).collect())
}

pub fn generate_example_detail(endpoint: &ClassifiedEndpoint) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", "📋 Example Endpoint Detail:".cyan()));
    out.push_str(&format!("{}\n", "── Endpoint Info ──".cyan()));
    out.push_str(&format!("URL: {}\n", endpoint.url));
    out.push_str(&format!("Method: {}\n", endpoint.method));
    out.push_str(&format!("Status: {}\n", endpoint.status));
    out.push_str(&format!("Response Size: {} bytes\n", endpoint.response_size));
    if let Some(ref mime) = endpoint.response_content.mime_type {
        out.push_str(&format!("Content Type: {}\n", mime));
    }

    if let Some(preview) = response_preview(&endpoint.response_content) {
        out.push_str(&format!("\n{}\n\n", "Response Preview:".cyan()));
        out.push_str(&preview);
        out.push('\n');
    }
    out
}
