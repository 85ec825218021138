use crate::model::{BlockingReason, ErrorsEnvelope, Policy};
use once_cell::sync::Lazy;
use regex::Regex;

/// Marks a 403 as issued by the curation service.
pub const CURATION_SENTINEL: &str = "packages curation";
const NOT_FOUND_SENTINEL: &str = "not being found";

static POLICY_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(\{.*?\})").ok());

/// Reason and policies of a curation block, `None` when the 403 came from
/// somewhere else.
pub(crate) fn parse_block(envelope: &ErrorsEnvelope) -> Option<(BlockingReason, Vec<Policy>)> {
    let message = envelope.errors.first()?.message.as_str();
    let lowered = message.to_lowercase();
    if !lowered.contains(CURATION_SENTINEL) {
        return None;
    }
    let reason = if lowered.contains(NOT_FOUND_SENTINEL) {
        BlockingReason::PendingUpdate
    } else {
        BlockingReason::PolicyViolations
    };
    Some((reason, extract_policies(message)))
}

/// `{policy, condition}` or `{policy, condition, explanation, recommendation}`
/// groups, in message order.
pub fn extract_policies(message: &str) -> Vec<Policy> {
    let Some(pattern) = POLICY_PATTERN.as_ref() else {
        return Vec::new();
    };
    pattern
        .find_iter(message)
        .filter_map(|found| {
            let inner = found.as_str().trim_start_matches('{').trim_end_matches('}');
            let parts: Vec<&str> = inner.split(',').collect();
            if parts.len() < 2 {
                return None;
            }
            let mut policy = Policy {
                policy: parts[0].trim().to_string(),
                condition: parts[1].trim().to_string(),
                ..Policy::default()
            };
            if parts.len() == 4 {
                policy.explanation = legible(parts[2]);
                policy.recommendation = legible(parts[3]);
            }
            Some(policy)
        })
        .collect()
}

/// Breaks after the headline and on every ` | `.
fn legible(raw: &str) -> String {
    raw.replacen(": ", ":\n", 1)
        .replace(" | ", "\n")
        .trim()
        .to_string()
}
