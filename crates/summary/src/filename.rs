use crate::SummaryIndex;
use sha1::{Digest, Sha1};

pub const DATA_FILE_SUFFIX: &str = "-data";
pub const SARIF_FILE_SUFFIX: &str = ".sarif";

/// Target name of a recorded blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileName {
    /// Same args always land in the same file.
    Hashed(String),
    /// Fresh random name ending with the suffix.
    Random { suffix: &'static str },
}

pub fn determine_file_name(index: Option<SummaryIndex>, args: &[String]) -> FileName {
    if index == Some(SummaryIndex::SarifReports) {
        return FileName::Random {
            suffix: SARIF_FILE_SUFFIX,
        };
    }
    if args.is_empty() {
        return FileName::Random {
            suffix: DATA_FILE_SUFFIX,
        };
    }
    FileName::Hashed(hashed_file_name(args))
}

/// Lowercase hex sha1 of the space-joined args.
pub fn hashed_file_name(args: &[String]) -> String {
    let digest = Sha1::digest(args.join(" ").as_bytes());
    hex::encode(digest)
}
