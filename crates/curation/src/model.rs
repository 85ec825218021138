use depwarden_protocol::Provenance;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The only action the curation service reports.
pub const BLOCKED: &str = "blocked";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlockingReason {
    #[serde(rename = "Policy violations")]
    PolicyViolations,
    #[serde(rename = "Package pending update")]
    PendingUpdate,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl BlockingReason {
    pub fn as_str(self) -> &'static str {
        match self {
            BlockingReason::PolicyViolations => "Policy violations",
            BlockingReason::PendingUpdate => "Package pending update",
            BlockingReason::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BlockingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    Direct,
    #[default]
    Indirect,
}

impl Relation {
    pub fn from_depth(depth: usize) -> Self {
        if depth == 1 {
            Relation::Direct
        } else {
            Relation::Indirect
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Relation::Direct => "direct",
            Relation::Indirect => "indirect",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub policy: String,
    pub condition: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub recommendation: String,
}

/// One blocked package seen under one direct dependency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageStatus {
    pub action: String,
    #[serde(rename = "direct_dependency_package_name")]
    pub parent_name: String,
    #[serde(rename = "direct_dependency_package_version")]
    pub parent_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub blocked_package_url: String,
    #[serde(rename = "blocked_package_name")]
    pub package_name: String,
    #[serde(rename = "blocked_package_version")]
    pub package_version: String,
    pub blocking_reason: BlockingReason,
    #[serde(rename = "dependency_relation")]
    pub relation: Relation,
    #[serde(rename = "type")]
    pub package_type: String,
    #[serde(default, rename = "policies", skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<Policy>,
    #[serde(default, flatten)]
    pub provenance: Provenance,
}

/// Body of a 403 download answer, `{errors: [{status, message}]}`. Only
/// the messages are read.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorsEnvelope {
    #[serde(default)]
    pub errors: Vec<ErrorEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorEntry {
    #[serde(default)]
    pub message: String,
}
