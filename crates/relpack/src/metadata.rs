use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Project metadata consumed for the release banner.
///
/// Only the fields the packaging pipeline needs are deserialized; the
/// metadata file may carry arbitrary additional keys.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectMetadata {
    pub name: String,
    pub version: String,
}

impl ProjectMetadata {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read project metadata: {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse project metadata: {:?}", path))
    }
}
