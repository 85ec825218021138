use thiserror::Error;

pub type Result<T> = std::result::Result<T, SummaryError>;

#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("Unknown summary index '{0}' (expected build-scans|docker-scans|binaries-scans|sarif-reports)")]
    InvalidIndex(String),

    #[error("Lock error: {0}")]
    LockError(#[from] depwarden_lock::LockError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to render {file}: {reason}")]
    Render { file: String, reason: String },

    #[error("{0}")]
    Other(String),
}

impl From<tempfile::PersistError> for SummaryError {
    fn from(err: tempfile::PersistError) -> Self {
        SummaryError::IoError(err.error)
    }
}
