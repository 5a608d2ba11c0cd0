// Keyword classification of captured endpoints

use crate::model::{CapturedRequest, ClassifiedEndpoint, split_url};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Path/query fragments that suggest store map data
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "store",
    "map",
    "layout",
    "navigation",
    "floor",
    "aisle",
    "section",
    "zone",
    "location",
    "coordinates",
    "geometry",
    "geojson",
    "vector",
    "tile",
];

/// Patterns suggested to the user while capturing; broader than the
/// analysis set because product and inventory calls lead to store calls
pub const CAPTURE_HINT_KEYWORDS: &[&str] = &[
    "store",
    "map",
    "navigation",
    "layout",
    "location",
    "aisle",
    "product",
    "inventory",
];

/// Case-insensitive substring matcher over a keyword set
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordMatcher {
    keywords: Vec<String>,
}

impl KeywordMatcher {
    /// Keywords are trimmed and lower-cased; blanks and duplicates are dropped
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if !keyword.is_empty() && !normalized.contains(&keyword) {
                normalized.push(keyword);
            }
        }
        Self {
            keywords: normalized,
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn is_interesting(&self, path: &str, query: &str) -> bool {
        let path = path.to_lowercase();
        let query = query.to_lowercase();
        self.keywords
            .iter()
            .any(|k| path.contains(k.as_str()) || query.contains(k.as_str()))
    }

    pub fn matches_url(&self, url: &str) -> bool {
        let parts = split_url(url);
        self.is_interesting(&parts.path, &parts.query)
    }

    /// Reclassify endpoints that were already split. Running this over the
    /// output of [`classify`] with the same matcher returns it unchanged.
    pub fn retain_interesting(&self, endpoints: &[ClassifiedEndpoint]) -> Vec<ClassifiedEndpoint> {
        endpoints
            .iter()
            .filter(|e| self.is_interesting(&e.path, &e.query))
            .cloned()
            .collect()
    }
}

impl Default for KeywordMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS)
    }
}

/// Restricts classification to domains containing a substring
#[derive(Debug, Clone, PartialEq)]
pub struct DomainFilter(String);

impl DomainFilter {
    pub fn new(fragment: &str) -> Self {
        Self(fragment.trim().to_lowercase())
    }

    pub fn allows(&self, domain: &str) -> bool {
        domain.to_lowercase().contains(&self.0)
    }
}

/// Return the interesting requests, in capture order
pub fn classify(
    requests: &[CapturedRequest],
    matcher: &KeywordMatcher,
    domain_filter: Option<&DomainFilter>,
) -> Vec<ClassifiedEndpoint> {
    requests
        .iter()
        .map(ClassifiedEndpoint::from_request)
        .filter(|e| domain_filter.is_none_or(|f| f.allows(&e.domain)))
        .filter(|e| matcher.is_interesting(&e.path, &e.query))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSummary {
    pub requests: usize,
    pub interesting: usize,
}

/// Per-domain request and match counts, sorted by domain
pub fn domain_summaries(
    requests: &[CapturedRequest],
    endpoints: &[ClassifiedEndpoint],
) -> BTreeMap<String, DomainSummary> {
    let mut summaries: BTreeMap<String, DomainSummary> = BTreeMap::new();

    for request in requests {
        let domain = split_url(&request.url).domain;
        summaries.entry(domain).or_default().requests += 1;
    }
    for endpoint in endpoints {
        summaries.entry(endpoint.domain.clone()).or_default().interesting += 1;
    }

    summaries
}
