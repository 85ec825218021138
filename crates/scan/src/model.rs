use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Severity as reported by the scan service. Ordered from least to most
/// severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    #[default]
    Unknown,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Unknown => "Unknown",
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }

    fn rank(self) -> u8 {
        match self {
            Severity::Unknown => 0,
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Critical => 4,
        }
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            "unknown" | "" => Ok(Severity::Unknown),
            other => Err(format!(
                "unsupported severity '{other}' (expected low|medium|high|critical)"
            )),
        }
    }
}

impl From<String> for Severity {
    fn from(raw: String) -> Self {
        raw.parse().unwrap_or_default()
    }
}

impl From<Severity> for String {
    fn from(severity: Severity) -> Self {
        severity.as_str().to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResponse {
    #[serde(default)]
    pub scan_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vulnerabilities: Vec<Vulnerability>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub licenses: Vec<License>,
}

impl ScanResponse {
    pub fn issue_count(&self) -> usize {
        self.vulnerabilities.len() + self.violations.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vulnerability {
    #[serde(default)]
    pub issue_id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub cves: Vec<Cve>,
    /// Affected component id → fix and impact data.
    #[serde(default)]
    pub components: BTreeMap<String, Component>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    #[serde(default)]
    pub issue_id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub severity: Severity,
    /// `security`, `license` or `operational_risk`.
    #[serde(default, rename = "type")]
    pub violation_type: String,
    #[serde(default)]
    pub cves: Vec<Cve>,
    #[serde(default)]
    pub components: BTreeMap<String, Component>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub watch_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub license_key: String,
}

impl Violation {
    pub fn is_license(&self) -> bool {
        self.violation_type == "license"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub components: BTreeMap<String, Component>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixed_versions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub impact_paths: Vec<Vec<ImpactPathNode>>,
}

impl Component {
    pub fn is_fixable(&self) -> bool {
        !self.fixed_versions.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactPathNode {
    pub component_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub full_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cve {
    #[serde(default)]
    pub cve: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cvss_v2_score: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cvss_v3_score: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_and_parses_loosely() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Low > Severity::Unknown);
        assert_eq!("HIGH".parse::<Severity>(), Ok(Severity::High));
        assert!("urgent".parse::<Severity>().is_err());
        let parsed: Severity = serde_json::from_str("\"Urgent\"").unwrap();
        assert_eq!(parsed, Severity::Unknown);
    }

    #[test]
    fn response_parses_service_shape() {
        let raw = r#"{
            "scan_id": "9c9dbd61",
            "vulnerabilities": [{
                "issue_id": "XRAY-1",
                "summary": "Prototype pollution",
                "severity": "High",
                "cves": [{"cve": "CVE-2021-23337", "cvss_v3_score": "7.2"}],
                "components": {"npm://lodash:4.17.20": {"fixed_versions": ["[4.17.21]"]}},
                "references": ["https://example.test/advisory"]
            }],
            "violations": [{"issue_id": "XRAY-2", "type": "license", "severity": "Medium",
                            "license_key": "GPL-3.0", "watch_name": "w",
                            "components": {"npm://gpl:1.0.0": {}}}]
        }"#;
        let response: ScanResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.issue_count(), 2);
        assert!(response.vulnerabilities[0].components["npm://lodash:4.17.20"].is_fixable());
        assert!(response.violations[0].is_license());
    }
}
