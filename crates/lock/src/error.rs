use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LockError>;

#[derive(Error, Debug)]
pub enum LockError {
    #[error("lock hasn't been acquired: {dir} still held by another process after {attempts} attempts")]
    Unavailable { dir: PathBuf, attempts: u32 },

    #[error("invalid lock token '{name}': {reason}")]
    InvalidToken { name: String, reason: String },

    #[error("lock token {0} was removed while waiting for the lock")]
    TokenLost(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl LockError {
    pub(crate) fn invalid_token(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidToken {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
