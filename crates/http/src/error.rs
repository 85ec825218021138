use thiserror::Error;

pub type Result<T> = std::result::Result<T, HttpError>;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("{method} {url} failed after {attempts} attempts: {reason}")]
    Transient {
        method: &'static str,
        url: String,
        attempts: u32,
        status: Option<u16>,
        reason: String,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl HttpError {
    /// Status code of the last attempt, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Transient { status, .. } => *status,
            _ => None,
        }
    }
}
