use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Unknown capture file format: {0}")]
    UnknownFormat(String),

    #[error("API configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("No target store: {0}")]
    NoTarget(String),

    #[error("Invalid coordinates '{0}': expected LAT,LNG")]
    InvalidCoordinates(String),

    #[error("Invalid header '{0}': expected NAME:VALUE")]
    InvalidHeader(String),

    #[error("Failed to serialize {0}: {1}")]
    Serialize(&'static str, #[source] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// What the user can do about it
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Error::NotFound(_) => Some("Check the path, or export the capture into data/captured/ first."),
            Error::InvalidJson(_) | Error::UnknownFormat(_) => Some(
                "Export the capture as HAR (File -> Export -> HAR) or as a session file with a top-level `requests` array.",
            ),
            Error::ConfigurationMissing(_) => Some(
                "Capture traffic while using the app's store mode, then run `aislemap analyze <capture>` to discover map endpoints.",
            ),
            Error::NoTarget(_) => Some("Provide a store ID with --store-id."),
            Error::InvalidCoordinates(_) => Some("Example: --coordinates 44.9778,-93.2650"),
            Error::InvalidHeader(_) => Some("Example: --header 'Authorization: Bearer <token>'"),
            Error::Http(_) => Some("Check the endpoint URL and that captured authentication headers are still valid."),
            Error::Serialize(..) | Error::Io(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
