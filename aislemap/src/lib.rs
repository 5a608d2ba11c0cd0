pub mod handlers;

// Re-export the pieces the binary and tests reach for most
pub use handlers::{
    AnalysisOutcome, AnalyzeOptions, CaptureOptions, DownloadOptions, expand_path,
    keyword_matcher, request_headers, run_analysis, run_download,
};

pub use aislemap_core::{Error, Result, print_banner};
