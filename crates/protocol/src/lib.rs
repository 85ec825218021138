//! Shared vocabulary for the depwarden workspace.
//!
//! Everything here is plain data: the technologies we know how to resolve,
//! where the process reads its environment, how servers are addressed and
//! which output formats and exit codes the CLI speaks. [`TextTable`] renders
//! the tables every command prints.

use anyhow::Result;
use serde::Serialize;

mod env;
mod format;
mod server;
mod settings;
mod table;
mod technology;

pub use env::{
    dependencies_dir, home_dir, resolve_home_dir, summary_output_dir, Provenance,
    BUILD_NAME_ENV, BUILD_NUMBER_ENV, DEPENDENCIES_DIR_ENV, HOME_DIR_ENV, PROJECT_ENV,
    RELEASES_URL_ENV, SUMMARY_OUTPUT_DIR_ENV,
};
pub use format::{ExitCode, OutputFormat};
pub use server::{Credentials, ServerDetails};
pub use settings::{parse_threads, Settings, DEFAULT_SETTINGS_FILE};
pub use table::TextTable;
pub use technology::{DetectionSignature, Technology};

/// Serializes to compact JSON. serde_json never escapes `<`, `>` or `&`, which
/// keeps Markdown payloads readable on disk.
pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}

pub fn serialize_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_keeps_html_characters() {
        let raw = serialize_json(&"<a href='x'>&</a>").expect("json");
        assert_eq!(raw, "\"<a href='x'>&</a>\"");
    }
}
