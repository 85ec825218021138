//! Retrying HTTP client shared by the curation, scan and summary crates.

mod client;
mod error;

pub use client::{HttpClient, HttpConfig, HttpResponse};
pub use error::{HttpError, Result};
