use serde::{Deserialize, Serialize};
use url::Url;

/// A single request/response header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Response body as exported by the proxy. Every field is optional because
/// exporters disagree on what they include.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

/// Normalized request record produced by capture ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedRequest {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub response_size: i64,
    #[serde(default)]
    pub response_content: ResponseContent,
}

impl CapturedRequest {
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            method: method.to_string(),
            url: url.to_string(),
            headers: Vec::new(),
            status: 0,
            response_size: 0,
            response_content: ResponseContent::default(),
        }
    }

    pub fn url_parts(&self) -> UrlParts {
        split_url(&self.url)
    }
}

/// A captured request projected onto the fields the analysis report keeps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedEndpoint {
    pub domain: String,
    pub method: String,
    pub url: String,
    pub path: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub response_size: i64,
    #[serde(default)]
    pub response_content: ResponseContent,
}

impl ClassifiedEndpoint {
    pub fn from_request(request: &CapturedRequest) -> Self {
        let UrlParts {
            domain,
            path,
            query,
        } = request.url_parts();

        Self {
            domain,
            method: request.method.clone(),
            url: request.url.clone(),
            path,
            query,
            status: request.status,
            response_size: request.response_size,
            response_content: request.response_content.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParts {
    /// Host, with `:port` when the URL names a non-default port
    pub domain: String,
    pub path: String,
    /// Raw query string without the leading `?`
    pub query: String,
}

/// Split a URL into domain, path and query.
///
/// Strings that are not absolute URLs (relative paths, garbage from a broken
/// export) are split by hand so classification still sees their text.
pub fn split_url(raw: &str) -> UrlParts {
    if let Ok(url) = Url::parse(raw)
        && let Some(host) = url.host_str()
    {
        let domain = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        return UrlParts {
            domain,
            path: url.path().to_string(),
            query: url.query().unwrap_or_default().to_string(),
        };
    }

    let without_fragment = raw.split('#').next().unwrap_or_default();
    let (path, query) = without_fragment
        .split_once('?')
        .unwrap_or((without_fragment, ""));

    UrlParts {
        domain: String::new(),
        path: path.to_string(),
        query: query.to_string(),
    }
}
