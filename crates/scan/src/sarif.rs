//! SARIF 2.1.0 rendering of audit results.

use crate::model::{Component, Cve, Severity};
use crate::results::AuditResults;
use depwarden_graph::ComponentId;
use serde::Serialize;
use std::collections::BTreeMap;

pub const SARIF_VERSION: &str = "2.1.0";
pub const SARIF_SCHEMA: &str = "https://json.schemastore.org/sarif-2.1.0.json";
const TOOL_NAME: &str = "depwarden";
const TOOL_URI: &str = "https://github.com/depwarden/depwarden";

#[derive(Debug, Serialize)]
pub struct SarifLog {
    pub version: &'static str,
    #[serde(rename = "$schema")]
    pub schema: &'static str,
    pub runs: Vec<SarifRun>,
}

#[derive(Debug, Serialize)]
pub struct SarifRun {
    pub tool: SarifTool,
    pub results: Vec<SarifResult>,
}

#[derive(Debug, Serialize)]
pub struct SarifTool {
    pub driver: SarifDriver,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifDriver {
    pub name: &'static str,
    pub information_uri: &'static str,
    pub rules: Vec<SarifRule>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifRule {
    pub id: String,
    pub short_description: SarifText,
    pub full_description: SarifText,
    pub help: SarifText,
    pub properties: BTreeMap<&'static str, String>,
}

#[derive(Debug, Serialize)]
pub struct SarifText {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifResult {
    pub rule_id: String,
    pub level: &'static str,
    pub message: SarifText,
    pub locations: Vec<SarifLocation>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifLocation {
    pub physical_location: SarifPhysicalLocation,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifPhysicalLocation {
    pub artifact_location: SarifArtifactLocation,
}

#[derive(Debug, Serialize)]
pub struct SarifArtifactLocation {
    pub uri: String,
}

/// Numeric score code scanners sort on.
pub fn security_severity(severity: Severity) -> f32 {
    match severity {
        Severity::Critical => 10.0,
        Severity::High => 8.9,
        Severity::Medium => 6.9,
        Severity::Low => 3.9,
        Severity::Unknown => 0.0,
    }
}

pub fn level(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical | Severity::High => "error",
        Severity::Medium => "warning",
        Severity::Low | Severity::Unknown => "note",
    }
}

/// Highest CVSS v3 score, falling back to the severity's score.
fn score(cves: &[Cve], severity: Severity) -> String {
    let max = cves
        .iter()
        .filter_map(|cve| cve.cvss_v3_score.parse::<f32>().ok())
        .fold(None, |max: Option<f32>, score| Some(max.map_or(score, |m| m.max(score))));
    format!("{:.1}", max.unwrap_or_else(|| security_severity(severity)))
}

fn headline(key: &str, id: &str) -> String {
    match ComponentId::parse(id) {
        Ok(parsed) => format!("[{key}] {}:{}", parsed.name, parsed.version_or_empty()),
        Err(_) => format!("[{key}] {id}"),
    }
}

fn cve_key(cves: &[Cve], issue_id: &str) -> String {
    let ids: Vec<&str> = cves
        .iter()
        .map(|cve| cve.cve.as_str())
        .filter(|id| !id.is_empty())
        .collect();
    if ids.is_empty() {
        issue_id.to_string()
    } else {
        ids.join(", ")
    }
}

struct Issue<'a> {
    issue_id: &'a str,
    summary: &'a str,
    severity: Severity,
    cves: &'a [Cve],
    components: &'a BTreeMap<String, Component>,
}

#[derive(Default)]
struct RunBuilder {
    rules: Vec<SarifRule>,
    results: Vec<SarifResult>,
}

impl RunBuilder {
    fn add(&mut self, issue: Issue<'_>, descriptor: &str) {
        if !self.rules.iter().any(|rule| rule.id == issue.issue_id) {
            let mut properties = BTreeMap::new();
            properties.insert("security-severity", score(issue.cves, issue.severity));
            self.rules.push(SarifRule {
                id: issue.issue_id.to_string(),
                short_description: SarifText {
                    text: issue.summary.to_string(),
                },
                full_description: SarifText {
                    text: issue.summary.to_string(),
                },
                help: SarifText {
                    text: format!("Severity: {}", issue.severity),
                },
                properties,
            });
        }
        let key = cve_key(issue.cves, issue.issue_id);
        for (id, component) in issue.components {
            let mut text = headline(&key, id);
            if component.is_fixable() {
                text.push_str(&format!(
                    ". Fixed in versions: {}",
                    component.fixed_versions.join(",")
                ));
            }
            self.results.push(SarifResult {
                rule_id: issue.issue_id.to_string(),
                level: level(issue.severity),
                message: SarifText { text },
                locations: vec![SarifLocation {
                    physical_location: SarifPhysicalLocation {
                        artifact_location: SarifArtifactLocation {
                            uri: descriptor.to_string(),
                        },
                    },
                }],
            });
        }
    }
}

/// Builds the log. Security violations replace plain vulnerabilities when
/// a policy context produced any.
pub fn to_sarif(results: &AuditResults) -> SarifLog {
    let mut run = RunBuilder::default();
    let has_violations = results
        .scans
        .iter()
        .any(|scan| !scan.response.violations.is_empty());
    for scan in &results.scans {
        let descriptor = scan.descriptor().display().to_string();
        let response = &scan.response;
        if has_violations {
            for violation in &response.violations {
                run.add(
                    Issue {
                        issue_id: &violation.issue_id,
                        summary: if violation.is_license() {
                            &violation.license_key
                        } else {
                            &violation.summary
                        },
                        severity: violation.severity,
                        cves: &violation.cves,
                        components: &violation.components,
                    },
                    &descriptor,
                );
            }
        } else {
            for vulnerability in &response.vulnerabilities {
                run.add(
                    Issue {
                        issue_id: &vulnerability.issue_id,
                        summary: &vulnerability.summary,
                        severity: vulnerability.severity,
                        cves: &vulnerability.cves,
                        components: &vulnerability.components,
                    },
                    &descriptor,
                );
            }
        }
    }
    SarifLog {
        version: SARIF_VERSION,
        schema: SARIF_SCHEMA,
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: TOOL_NAME,
                    information_uri: TOOL_URI,
                    rules: run.rules,
                },
            },
            results: run.results,
        }],
    }
}
