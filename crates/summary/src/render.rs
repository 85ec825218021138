use crate::{MarkdownConfig, Result};
use std::path::PathBuf;

/// Turns the data files of one command store into a Markdown body.
///
/// The store never looks inside the blobs; each renderer owns its schema.
pub trait SummaryRenderer: Send + Sync {
    fn title(&self) -> String;

    /// `data_files` are in insertion order.
    fn render(&self, data_files: &[PathBuf], config: &MarkdownConfig) -> Result<String>;
}

/// Reads and parses one JSON data file, naming the file on failure.
pub fn read_json_file<T: serde::de::DeserializeOwned>(path: &std::path::Path) -> Result<T> {
    let raw = std::fs::read(path)?;
    serde_json::from_slice(&raw).map_err(|err| crate::SummaryError::Render {
        file: path.display().to_string(),
        reason: err.to_string(),
    })
}
