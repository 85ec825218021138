use depwarden_protocol::Technology;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DepTreeError {
    #[error("{0} is not supported for dependency tree resolution")]
    Unsupported(Technology),

    #[error("'{program}' could not be started: {reason}")]
    ToolNotFound { program: String, reason: String },

    #[error("{program} exited with {code}:\n{output}")]
    ResolverFailed {
        program: String,
        code: String,
        output: String,
    },

    #[error("malformed resolver output in {source_name}: {reason}")]
    ParseCorrupt { source_name: String, reason: String },

    #[error("found a leftover backup at {0}; restore or remove it before running again")]
    BackupExists(PathBuf),

    #[error("no project found at {0}")]
    NoProject(PathBuf),

    #[error("Graph error: {0}")]
    GraphError(#[from] depwarden_graph::GraphError),

    #[error("Lock error: {0}")]
    LockError(#[from] depwarden_lock::LockError),

    #[error("HTTP error: {0}")]
    HttpError(#[from] depwarden_http::HttpError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl DepTreeError {
    pub(crate) fn corrupt(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::ParseCorrupt {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DepTreeError>;
