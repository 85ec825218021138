use crate::model::{ScanResponse, Severity};
use depwarden_protocol::Technology;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Scan results of one technology in one working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnologyScan {
    pub technology: Technology,
    pub working_dir: PathBuf,
    pub response: ScanResponse,
}

impl TechnologyScan {
    /// File the results are reported against.
    pub fn descriptor(&self) -> PathBuf {
        self.working_dir.join(descriptor_file(self.technology, &self.working_dir))
    }
}

/// A working directory or technology that could not be scanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanFailure {
    pub file_path: String,
    pub error_message: String,
}

/// Everything one `audit` run produced, partial failures included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditResults {
    pub scans: Vec<TechnologyScan>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ScanFailure>,
}

impl AuditResults {
    pub fn push(&mut self, scan: TechnologyScan) {
        self.scans.push(scan);
    }

    pub fn fail(&mut self, path: &Path, message: impl Into<String>) {
        self.errors.push(ScanFailure {
            file_path: path.display().to_string(),
            error_message: message.into(),
        });
    }

    pub fn issue_count(&self) -> usize {
        self.scans.iter().map(|scan| scan.response.issue_count()).sum()
    }

    pub fn has_issues(&self) -> bool {
        self.issue_count() > 0
    }

    pub fn highest_severity(&self) -> Option<Severity> {
        self.scans
            .iter()
            .flat_map(|scan| {
                let response = &scan.response;
                response
                    .vulnerabilities
                    .iter()
                    .map(|v| v.severity)
                    .chain(response.violations.iter().map(|v| v.severity))
            })
            .max()
    }
}

/// Descriptor file name of `technology` inside `dir`; the first candidate
/// present wins, otherwise the conventional name.
pub fn descriptor_file(technology: Technology, dir: &Path) -> &'static str {
    let candidates: &[&'static str] = match technology {
        Technology::Maven => &["pom.xml"],
        Technology::Gradle => &["build.gradle.kts", "build.gradle"],
        Technology::Npm | Technology::Yarn => &["package.json"],
        Technology::Go => &["go.mod"],
        Technology::Pip => &["requirements.txt", "setup.py"],
        Technology::Pipenv => &["Pipfile"],
        Technology::Poetry => &["pyproject.toml"],
        Technology::Nuget => &["packages.config", "Directory.Packages.props"],
        Technology::Docker => &["Dockerfile"],
    };
    candidates
        .iter()
        .copied()
        .find(|name| dir.join(name).is_file())
        .unwrap_or(candidates[0])
}

/// Display type for a canonical id scheme.
pub fn package_type_for_scheme(scheme: &str) -> &'static str {
    match scheme {
        "gav" => "Maven",
        "npm" => "npm",
        "go" => "Go",
        "pypi" => "Python",
        "nuget" => "NuGet",
        _ => "Generic",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Vulnerability;
    use tempfile::TempDir;

    #[test]
    fn descriptor_prefers_existing_files() {
        let dir = TempDir::new().unwrap();
        assert_eq!(descriptor_file(Technology::Pip, dir.path()), "requirements.txt");
        std::fs::write(dir.path().join("setup.py"), "").unwrap();
        assert_eq!(descriptor_file(Technology::Pip, dir.path()), "setup.py");
    }

    #[test]
    fn highest_severity_spans_scans() {
        let scan = |severity| TechnologyScan {
            technology: Technology::Npm,
            working_dir: PathBuf::from("/work"),
            response: ScanResponse {
                vulnerabilities: vec![Vulnerability {
                    severity,
                    ..Vulnerability::default()
                }],
                ..ScanResponse::default()
            },
        };
        let results = AuditResults {
            scans: vec![scan(Severity::Medium), scan(Severity::Critical)],
            errors: Vec::new(),
        };
        assert_eq!(results.highest_severity(), Some(Severity::Critical));
        assert_eq!(results.issue_count(), 2);
        assert!(AuditResults::default().highest_severity().is_none());
    }
}
