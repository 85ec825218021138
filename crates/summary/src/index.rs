use crate::{Result, SummaryError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Subdirectories a command store may keep indexed blobs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryIndex {
    BuildScans,
    DockerScans,
    BinariesScans,
    SarifReports,
}

impl SummaryIndex {
    pub const ALL: [SummaryIndex; 4] = [
        SummaryIndex::BuildScans,
        SummaryIndex::DockerScans,
        SummaryIndex::BinariesScans,
        SummaryIndex::SarifReports,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SummaryIndex::BuildScans => "build-scans",
            SummaryIndex::DockerScans => "docker-scans",
            SummaryIndex::BinariesScans => "binaries-scans",
            SummaryIndex::SarifReports => "sarif-reports",
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        Self::from_dir_name(name).ok_or_else(|| SummaryError::InvalidIndex(name.to_string()))
    }

    /// Like [`SummaryIndex::parse`], for directory walks where foreign names
    /// are skipped.
    pub fn from_dir_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|index| index.as_str() == name)
    }
}

impl fmt::Display for SummaryIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
