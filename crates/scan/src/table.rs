use crate::simple_json::{LicenseRow, SimpleJsonResults, VulnerabilityRow};
use depwarden_protocol::TextTable;

fn direct(row: &VulnerabilityRow) -> String {
    row.package
        .components
        .iter()
        .map(|package| format!("{}:{}", package.name, package.version))
        .collect::<Vec<_>>()
        .join("\n")
}

fn cves(row: &VulnerabilityRow) -> String {
    row.cves
        .iter()
        .map(|cve| cve.id.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn issue_table(rows: &[VulnerabilityRow]) -> TextTable {
    let mut table = TextTable::new([
        "SEVERITY",
        "DIRECT DEPENDENCIES",
        "IMPACTED PACKAGE",
        "VERSION",
        "FIXED VERSIONS",
        "CVE",
        "ISSUE ID",
    ]);
    for row in rows {
        table.push([
            row.severity.to_string(),
            direct(row),
            row.package.impacted_package_name.clone(),
            row.package.impacted_package_version.clone(),
            row.fixed_versions.join("\n"),
            cves(row),
            row.issue_id.clone(),
        ]);
    }
    table
}

fn license_table(rows: &[LicenseRow]) -> TextTable {
    let mut table = TextTable::new(["LICENSE", "IMPACTED PACKAGE", "VERSION", "TYPE"]);
    for row in rows {
        table.push([
            row.license_key.clone(),
            row.package.impacted_package_name.clone(),
            row.package.impacted_package_version.clone(),
            row.package.impacted_package_type.clone(),
        ]);
    }
    table
}

fn section(out: &mut String, title: &str, table: TextTable) {
    if table.is_empty() {
        return;
    }
    out.push_str(&format!("{title} ({})\n", table.len()));
    out.push_str(&table.render());
    out.push('\n');
}

/// Human-readable report; every non-empty category gets its own table.
pub fn render_tables(results: &SimpleJsonResults) -> String {
    let mut out = String::new();
    section(&mut out, "Security violations", issue_table(&results.security_violations));
    section(&mut out, "Vulnerabilities", issue_table(&results.vulnerabilities));
    section(
        &mut out,
        "Operational risk violations",
        issue_table(&results.operational_risk_violations),
    );
    section(&mut out, "License violations", license_table(&results.licenses_violations));
    section(&mut out, "Licenses", license_table(&results.licenses));
    if out.is_empty() {
        out.push_str("No issues found\n");
    }
    for error in &results.errors {
        out.push_str(&format!("Failed to scan {}: {}\n", error.file_path, error.error_message));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;
    use crate::results::ScanFailure;
    use crate::simple_json::{ImpactedPackage, Package};

    #[test]
    fn empty_results_say_so() {
        assert_eq!(render_tables(&SimpleJsonResults::default()), "No issues found\n");
    }

    #[test]
    fn vulnerabilities_table_lists_direct_dependencies() {
        let results = SimpleJsonResults {
            vulnerabilities: vec![VulnerabilityRow {
                severity: Severity::High,
                package: ImpactedPackage {
                    impacted_package_name: "qs".into(),
                    impacted_package_version: "6.0.0".into(),
                    impacted_package_type: "npm".into(),
                    components: vec![Package {
                        name: "express".into(),
                        version: "4.0.0".into(),
                    }],
                    impact_paths: Vec::new(),
                },
                issue_id: "XRAY-QS".into(),
                ..VulnerabilityRow::default()
            }],
            errors: vec![ScanFailure {
                file_path: "/work/go".into(),
                error_message: "go: not found".into(),
            }],
            ..SimpleJsonResults::default()
        };
        let out = render_tables(&results);
        assert!(out.starts_with("Vulnerabilities (1)\n"));
        assert!(out.contains("| High     | express:4.0.0       | qs "));
        assert!(out.ends_with("Failed to scan /work/go: go: not found\n"));
        assert!(!out.contains("Licenses"));
    }
}
