use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScanError>;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Scan service answered {status} for {url}: {body}")]
    Rejected { url: String, status: u16, body: String },

    #[error("Scan {scan_id} was still in progress after {polls} polls")]
    Timeout { scan_id: String, polls: u32 },

    #[error("Scan service did not return a scan id")]
    MissingScanId,

    #[error("Invalid scan service url: {0}")]
    InvalidUrl(String),

    #[error("Xray url is not configured")]
    ConfigMissing,

    #[error("HTTP error: {0}")]
    HttpError(#[from] depwarden_http::HttpError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
