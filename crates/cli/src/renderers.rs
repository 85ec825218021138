use depwarden_curation::{PackageStatus, ProjectStatuses};
use depwarden_scan::{AuditResults, ScanFailure, Severity};
use depwarden_summary::{
    read_json_file, MarkdownConfig, Result, SummaryRenderer, UploadSummaryRenderer,
    UPLOAD_COMMAND,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Commands that keep a summary store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SummaryCommand {
    Upload,
    CurationAudit,
    Audit,
}

impl SummaryCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            SummaryCommand::Upload => UPLOAD_COMMAND,
            SummaryCommand::CurationAudit => "curation-audit",
            SummaryCommand::Audit => "audit",
        }
    }
}

pub fn renderer_for(command: SummaryCommand) -> Arc<dyn SummaryRenderer> {
    match command {
        SummaryCommand::Upload => Arc::new(UploadSummaryRenderer),
        SummaryCommand::CurationAudit => Arc::new(CurationSummaryRenderer),
        SummaryCommand::Audit => Arc::new(AuditSummaryRenderer),
    }
}

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', "<br>")
}

/// Blocked packages of every recorded curation run, one table per project.
#[derive(Debug, Default, Clone, Copy)]
pub struct CurationSummaryRenderer;

impl CurationSummaryRenderer {
    fn package(status: &PackageStatus, config: &MarkdownConfig) -> String {
        let label = format!("{}:{}", status.package_name, status.package_version);
        if config.extended && !status.blocked_package_url.is_empty() {
            format!(
                "<a href='{}' target=\"_blank\">{label}</a>",
                status.blocked_package_url
            )
        } else {
            cell(&label)
        }
    }

    fn policies(status: &PackageStatus) -> String {
        let policies: Vec<String> = status
            .policies
            .iter()
            .map(|policy| format!("{} ({})", policy.policy, policy.condition))
            .collect();
        cell(&policies.join(", "))
    }
}

impl SummaryRenderer for CurationSummaryRenderer {
    fn title(&self) -> String {
        "📦 Curation audit".to_string()
    }

    fn render(&self, data_files: &[PathBuf], config: &MarkdownConfig) -> Result<String> {
        let mut merged = ProjectStatuses::new();
        for path in data_files {
            let chunk: ProjectStatuses = read_json_file(path)?;
            for (project, statuses) in chunk {
                merged.entry(project).or_default().extend(statuses);
            }
        }

        let mut out = String::from("\n");
        for (project, statuses) in &merged {
            if statuses.is_empty() {
                out.push_str(&format!("✅ `{project}`: no blocked packages\n\n"));
                continue;
            }
            out.push_str(&format!(
                "🚫 `{project}`: {} blocked packages\n\n",
                statuses.len()
            ));
            out.push_str(
                "| Blocked package | Direct dependency | Relation | Reason | Policies |\n",
            );
            out.push_str("|---|---|---|---|---|\n");
            for status in statuses {
                out.push_str(&format!(
                    "| {} | {} | {} | {} | {} |\n",
                    Self::package(status, config),
                    cell(&format!("{}:{}", status.parent_name, status.parent_version)),
                    status.relation,
                    status.blocking_reason,
                    Self::policies(status),
                ));
            }
            out.push('\n');
        }
        Ok(out)
    }
}

/// Issue counts of one scanned target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDigest {
    pub target: String,
    pub technology: String,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unknown: usize,
    pub violations: usize,
}

/// What an audit run contributes to the Markdown summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditDigest {
    pub targets: Vec<TargetDigest>,
    #[serde(default)]
    pub errors: Vec<ScanFailure>,
}

impl From<&AuditResults> for AuditDigest {
    fn from(results: &AuditResults) -> Self {
        let targets = results
            .scans
            .iter()
            .map(|scan| {
                let mut digest = TargetDigest {
                    target: scan.descriptor().display().to_string(),
                    technology: scan.technology.formal_name().to_string(),
                    violations: scan.response.violations.len(),
                    ..TargetDigest::default()
                };
                for vulnerability in &scan.response.vulnerabilities {
                    let count = match vulnerability.severity {
                        Severity::Critical => &mut digest.critical,
                        Severity::High => &mut digest.high,
                        Severity::Medium => &mut digest.medium,
                        Severity::Low => &mut digest.low,
                        Severity::Unknown => &mut digest.unknown,
                    };
                    *count += 1;
                }
                digest
            })
            .collect();
        Self {
            targets,
            errors: results.errors.clone(),
        }
    }
}

/// Per-target vulnerability counts of every recorded audit.
#[derive(Debug, Default, Clone, Copy)]
pub struct AuditSummaryRenderer;

impl SummaryRenderer for AuditSummaryRenderer {
    fn title(&self) -> String {
        "🔍 Security audit".to_string()
    }

    fn render(&self, data_files: &[PathBuf], _config: &MarkdownConfig) -> Result<String> {
        let mut merged = AuditDigest::default();
        for path in data_files {
            let chunk: AuditDigest = read_json_file(path)?;
            merged.targets.extend(chunk.targets);
            merged.errors.extend(chunk.errors);
        }

        let mut out = String::from("\n");
        if merged.targets.is_empty() {
            out.push_str("No targets were scanned\n\n");
        } else {
            out.push_str(
                "| Target | Technology | Critical | High | Medium | Low | Unknown | Violations |\n",
            );
            out.push_str("|---|---|---|---|---|---|---|---|\n");
            for target in &merged.targets {
                out.push_str(&format!(
                    "| {} | {} | {} | {} | {} | {} | {} | {} |\n",
                    cell(&target.target),
                    target.technology,
                    target.critical,
                    target.high,
                    target.medium,
                    target.low,
                    target.unknown,
                    target.violations,
                ));
            }
            out.push('\n');
        }
        for error in &merged.errors {
            out.push_str(&format!(
                "❌ `{}`: {}\n\n",
                error.file_path,
                cell(&error.error_message)
            ));
        }
        Ok(out)
    }
}
