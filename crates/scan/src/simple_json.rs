use crate::model::{Component, Cve, ImpactPathNode, Severity, Violation, Vulnerability};
use crate::results::{package_type_for_scheme, AuditResults, ScanFailure};
use depwarden_graph::ComponentId;
use serde::{Deserialize, Serialize};

/// Flat, row-per-component rendering of audit results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleJsonResults {
    pub vulnerabilities: Vec<VulnerabilityRow>,
    pub security_violations: Vec<VulnerabilityRow>,
    pub licenses_violations: Vec<LicenseRow>,
    pub licenses: Vec<LicenseRow>,
    pub operational_risk_violations: Vec<VulnerabilityRow>,
    pub errors: Vec<ScanFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub name: String,
    pub version: String,
}

impl Package {
    fn from_id(id: &str) -> Self {
        match ComponentId::parse(id) {
            Ok(parsed) => Self {
                version: parsed.version_or_empty().to_string(),
                name: parsed.name,
            },
            Err(_) => Self {
                name: id.to_string(),
                version: String::new(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CveRow {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cvss_v2: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cvss_v3: String,
}

impl From<&Cve> for CveRow {
    fn from(cve: &Cve) -> Self {
        Self {
            id: cve.cve.clone(),
            cvss_v2: cve.cvss_v2_score.clone(),
            cvss_v3: cve.cvss_v3_score.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactedPackage {
    pub impacted_package_name: String,
    pub impacted_package_version: String,
    pub impacted_package_type: String,
    /// Direct dependencies the package is pulled in through.
    pub components: Vec<Package>,
    pub impact_paths: Vec<Vec<Package>>,
}

impl ImpactedPackage {
    fn new(id: &str, component: &Component) -> Self {
        let package = Package::from_id(id);
        let scheme = id.split_once("://").map_or("", |(scheme, _)| scheme);
        Self {
            impacted_package_name: package.name,
            impacted_package_version: package.version,
            impacted_package_type: package_type_for_scheme(scheme).to_string(),
            components: direct_dependencies(&component.impact_paths),
            impact_paths: component
                .impact_paths
                .iter()
                .map(|path| path.iter().map(|node| Package::from_id(&node.component_id)).collect())
                .collect(),
        }
    }
}

/// Second hop of every path, the first being the project itself. A path of
/// one node means the package is the project.
fn direct_dependencies(paths: &[Vec<ImpactPathNode>]) -> Vec<Package> {
    let mut direct: Vec<Package> = Vec::new();
    for path in paths {
        let node = path.get(1).or_else(|| path.first());
        if let Some(node) = node {
            let package = Package::from_id(&node.component_id);
            if !direct.contains(&package) {
                direct.push(package);
            }
        }
    }
    direct
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VulnerabilityRow {
    pub summary: String,
    pub severity: Severity,
    #[serde(flatten)]
    pub package: ImpactedPackage,
    pub fixed_versions: Vec<String>,
    pub cves: Vec<CveRow>,
    pub issue_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub watch: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseRow {
    pub license_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(flatten)]
    pub package: ImpactedPackage,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub watch: String,
}

fn vulnerability_rows(
    vulnerability: &Vulnerability,
) -> impl Iterator<Item = VulnerabilityRow> + '_ {
    vulnerability.components.iter().map(|(id, component)| VulnerabilityRow {
        summary: vulnerability.summary.clone(),
        severity: vulnerability.severity,
        package: ImpactedPackage::new(id, component),
        fixed_versions: component.fixed_versions.clone(),
        cves: vulnerability.cves.iter().map(CveRow::from).collect(),
        issue_id: vulnerability.issue_id.clone(),
        references: vulnerability.references.clone(),
        watch: String::new(),
    })
}

fn violation_rows(violation: &Violation) -> impl Iterator<Item = VulnerabilityRow> + '_ {
    violation.components.iter().map(|(id, component)| VulnerabilityRow {
        summary: violation.summary.clone(),
        severity: violation.severity,
        package: ImpactedPackage::new(id, component),
        fixed_versions: component.fixed_versions.clone(),
        cves: violation.cves.iter().map(CveRow::from).collect(),
        issue_id: violation.issue_id.clone(),
        references: Vec::new(),
        watch: violation.watch_name.clone(),
    })
}

fn license_violation_rows(violation: &Violation) -> impl Iterator<Item = LicenseRow> + '_ {
    violation.components.iter().map(|(id, component)| LicenseRow {
        license_key: violation.license_key.clone(),
        severity: Some(violation.severity),
        package: ImpactedPackage::new(id, component),
        watch: violation.watch_name.clone(),
    })
}

fn by_severity(rows: &mut [VulnerabilityRow]) {
    rows.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.package.impacted_package_name.cmp(&b.package.impacted_package_name))
    });
}

impl From<&AuditResults> for SimpleJsonResults {
    fn from(results: &AuditResults) -> Self {
        let mut simple = SimpleJsonResults {
            errors: results.errors.clone(),
            ..SimpleJsonResults::default()
        };
        for scan in &results.scans {
            let response = &scan.response;
            simple
                .vulnerabilities
                .extend(response.vulnerabilities.iter().flat_map(vulnerability_rows));
            for violation in &response.violations {
                match violation.violation_type.as_str() {
                    "license" => simple
                        .licenses_violations
                        .extend(license_violation_rows(violation)),
                    "operational_risk" => simple
                        .operational_risk_violations
                        .extend(violation_rows(violation)),
                    _ => simple.security_violations.extend(violation_rows(violation)),
                }
            }
            for license in &response.licenses {
                simple
                    .licenses
                    .extend(license.components.iter().map(|(id, component)| LicenseRow {
                        license_key: license.key.clone(),
                        severity: None,
                        package: ImpactedPackage::new(id, component),
                        watch: String::new(),
                    }));
            }
        }
        by_severity(&mut simple.vulnerabilities);
        by_severity(&mut simple.security_violations);
        by_severity(&mut simple.operational_risk_violations);
        simple
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScanResponse;
    use crate::results::TechnologyScan;
    use depwarden_protocol::Technology;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn path(ids: &[&str]) -> Vec<ImpactPathNode> {
        ids.iter()
            .map(|id| ImpactPathNode {
                component_id: id.to_string(),
                full_path: String::new(),
            })
            .collect()
    }

    fn results() -> AuditResults {
        let qs = Component {
            fixed_versions: vec!["[6.0.4]".into()],
            impact_paths: vec![
                path(&["npm://app:1.0.0", "npm://express:4.0.0", "npm://qs:6.0.0"]),
                path(&["npm://app:1.0.0", "npm://body-parser:1.0.0", "npm://qs:6.0.0"]),
            ],
        };
        let response = ScanResponse {
            scan_id: "s".into(),
            vulnerabilities: vec![
                Vulnerability {
                    issue_id: "XRAY-LOW".into(),
                    severity: Severity::Low,
                    components: BTreeMap::from([("npm://minimist:1.0.0".into(), Component::default())]),
                    ..Vulnerability::default()
                },
                Vulnerability {
                    issue_id: "XRAY-QS".into(),
                    summary: "Prototype pollution".into(),
                    severity: Severity::High,
                    cves: vec![Cve {
                        cve: "CVE-2022-24999".into(),
                        cvss_v2_score: String::new(),
                        cvss_v3_score: "7.5".into(),
                    }],
                    components: BTreeMap::from([("npm://qs:6.0.0".into(), qs)]),
                    references: Vec::new(),
                },
            ],
            violations: vec![Violation {
                issue_id: "XRAY-LIC".into(),
                violation_type: "license".into(),
                severity: Severity::Medium,
                license_key: "GPL-3.0".into(),
                watch_name: "oss".into(),
                components: BTreeMap::from([("npm://gpl-lib:2.0.0".into(), Component::default())]),
                ..Violation::default()
            }],
            licenses: Vec::new(),
        };
        AuditResults {
            scans: vec![TechnologyScan {
                technology: Technology::Npm,
                working_dir: PathBuf::from("/work"),
                response,
            }],
            errors: Vec::new(),
        }
    }

    #[test]
    fn rows_are_sorted_and_carry_direct_dependencies() {
        let simple = SimpleJsonResults::from(&results());
        let ids: Vec<&str> = simple.vulnerabilities.iter().map(|r| r.issue_id.as_str()).collect();
        assert_eq!(ids, ["XRAY-QS", "XRAY-LOW"]);

        let qs = &simple.vulnerabilities[0];
        assert_eq!(qs.package.impacted_package_name, "qs");
        assert_eq!(qs.package.impacted_package_type, "npm");
        let direct: Vec<&str> = qs.package.components.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(direct, ["express", "body-parser"]);
        assert_eq!(qs.cves[0].cvss_v3, "7.5");
        assert_eq!(simple.licenses_violations[0].license_key, "GPL-3.0");
        assert!(simple.security_violations.is_empty());
    }

    #[test]
    fn json_uses_camel_case_fields() {
        let simple = SimpleJsonResults::from(&results());
        let value = serde_json::to_value(&simple).unwrap();
        let row = &value["vulnerabilities"][0];
        assert_eq!(row["impactedPackageName"], "qs");
        assert_eq!(row["impactedPackageVersion"], "6.0.0");
        assert_eq!(row["fixedVersions"][0], "[6.0.4]");
        assert_eq!(row["impactPaths"][0][1]["name"], "express");
        assert_eq!(row["issueId"], "XRAY-QS");
        assert!(value["operationalRiskViolations"].as_array().unwrap().is_empty());
    }
}
