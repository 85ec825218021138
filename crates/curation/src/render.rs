use crate::model::PackageStatus;
use crate::Result;
use depwarden_protocol::TextTable;
use std::collections::BTreeMap;

/// Project key (`name:version`) → blocked packages found in it.
pub type ProjectStatuses = BTreeMap<String, Vec<PackageStatus>>;

fn policies_cell(status: &PackageStatus) -> String {
    if status.policies.is_empty() {
        return String::new();
    }
    let detailed = status
        .policies
        .iter()
        .any(|policy| !policy.explanation.is_empty() || !policy.recommendation.is_empty());
    let mut table = if detailed {
        TextTable::new(["POLICY", "CONDITION", "EXPLANATION", "RECOMMENDATION"])
    } else {
        TextTable::new(["POLICY", "CONDITION"])
    };
    for policy in &status.policies {
        table.push([
            policy.policy.as_str(),
            policy.condition.as_str(),
            policy.explanation.as_str(),
            policy.recommendation.as_str(),
        ]);
    }
    table.render()
}

pub fn status_table(statuses: &[PackageStatus]) -> TextTable {
    let mut table = TextTable::new([
        "ACTION",
        "DIRECT DEPENDENCY\nPACKAGE NAME",
        "DIRECT DEPENDENCY\nPACKAGE VERSION",
        "BLOCKED URL",
        "BLOCKED\nPACKAGE NAME",
        "BLOCKED\nPACKAGE VERSION",
        "BLOCKING REASON",
        "PACKAGE\nTYPE",
        "VIOLATED POLICIES",
    ]);
    for status in statuses {
        table.push([
            status.action.clone(),
            status.parent_name.clone(),
            status.parent_version.clone(),
            status.blocked_package_url.clone(),
            status.package_name.clone(),
            status.package_version.clone(),
            status.blocking_reason.to_string(),
            status.package_type.clone(),
            policies_cell(status),
        ]);
    }
    table
}

pub fn headline(project: &str, statuses: &[PackageStatus]) -> String {
    format!("Found {} blocked packages for project {project}", statuses.len())
}

/// Headline per project, followed by its table when anything is blocked.
pub fn render_table(results: &ProjectStatuses) -> String {
    let mut out = String::new();
    for (project, statuses) in results {
        out.push_str(&headline(project, statuses));
        out.push('\n');
        if !statuses.is_empty() {
            out.push_str(&status_table(statuses).render());
        }
        out.push('\n');
    }
    out
}

pub fn render_json(results: &ProjectStatuses) -> Result<String> {
    Ok(serde_json::to_string_pretty(results)?)
}
