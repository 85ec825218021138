//! # Depwarden Summary
//!
//! Lock-protected, file-backed store that aggregates the results of many
//! command invocations and renders them to Markdown.
//!
//! ```text
//! record(data, index?, args?)
//!     │
//!     ├──> FileLock on <summary-root>/.locks
//!     ├──> file name: sha1(args) | <random>-data | <random>.sarif
//!     └──> atomic write
//!
//! generate_markdown()
//!     ├──> data files (insertion order)
//!     ├──> SummaryRenderer::render
//!     └──> <details> wrapper → markdown.md
//! ```

mod error;
mod filename;
mod index;
mod markdown;
mod render;
mod store;
mod upload;

pub use error::{Result, SummaryError};
pub use filename::{
    determine_file_name, hashed_file_name, FileName, DATA_FILE_SUFFIX, SARIF_FILE_SUFFIX,
};
pub use index::SummaryIndex;
pub use markdown::{probe_extended_summary, wrap_details, MarkdownConfig};
pub use render::{read_json_file, SummaryRenderer};
pub use store::{
    indexed_file_paths, CommandSummary, IndexedFiles, FINAL_MARKDOWN_FILE, SUMMARY_ROOT_DIR,
};
pub use upload::{
    FileTree, UploadResult, UploadResults, UploadSummaryRenderer, MAX_FILES_IN_TREE,
    UPLOAD_COMMAND,
};
