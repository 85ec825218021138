use depwarden_protocol::Technology;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CurationError>;

#[derive(Error, Debug)]
pub enum CurationError {
    #[error("{0}")]
    ConfigMissing(String),

    #[error(
        "It looks like this project uses '{0}' to download its dependencies. \
         This package manager however isn't supported by this command."
    )]
    Unsupported(Technology),

    #[error("found no dependencies for the audited project using '{0}' as the package manager")]
    NoDependencies(Technology),

    #[error("cannot build a download url for '{0}'")]
    InvalidId(String),

    #[error("failed sending {method} request to {url} for package '{name}:{version}'. Status-code: {status}")]
    Probe {
        method: &'static str,
        url: String,
        name: String,
        version: String,
        status: u16,
    },

    #[error(
        "received 403 for unknown reason, no curation status will be presented for this package. \
         package name: {name}, version: {version}, download url: {url}"
    )]
    UnknownForbidden {
        url: String,
        name: String,
        version: String,
    },

    #[error("curation probe task failed: {0}")]
    Task(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] depwarden_http::HttpError),

    #[error("Dependency tree error: {0}")]
    DepTreeError(#[from] depwarden_deptree::DepTreeError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("{}", join_messages(.0))]
    Joined(Vec<CurationError>),
}

fn join_messages(errors: &[CurationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl CurationError {
    /// `None` for no errors, the error itself for one, `Joined` otherwise.
    pub fn join(mut errors: Vec<CurationError>) -> Option<CurationError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(CurationError::Joined(errors)),
        }
    }
}
