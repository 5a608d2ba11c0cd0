use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = "data";

/// Directory layout for captured input, analysis output and downloaded maps
#[derive(Debug, Clone, PartialEq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn captured(&self) -> PathBuf {
        self.root.join("captured")
    }

    pub fn analyzed(&self) -> PathBuf {
        self.root.join("analyzed")
    }

    pub fn maps(&self) -> PathBuf {
        self.root.join("maps")
    }
}

impl Default for DataLayout {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}

/// Create `dir` (and parents) if missing
pub fn ensure_dir(dir: &Path) -> Result<&Path> {
    fs::create_dir_all(dir)?;
    Ok(dir)
}
