use crate::model::{Component, ScanResponse, Severity};
use std::collections::BTreeMap;

/// Narrows results to what the user asked to see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanFilter {
    pub min_severity: Option<Severity>,
    pub fixable_only: bool,
}

impl ScanFilter {
    pub fn is_noop(&self) -> bool {
        self.min_severity.is_none() && !self.fixable_only
    }

    fn keeps(&self, severity: Severity) -> bool {
        self.min_severity.map_or(true, |min| severity >= min)
    }

    /// Drops unfixable components when `fixable_only`; an issue left without
    /// components is dropped with them.
    fn components(&self, components: BTreeMap<String, Component>) -> BTreeMap<String, Component> {
        if !self.fixable_only {
            return components;
        }
        components
            .into_iter()
            .filter(|(_, component)| component.is_fixable())
            .collect()
    }

    pub fn apply(&self, mut response: ScanResponse) -> ScanResponse {
        if self.is_noop() {
            return response;
        }
        response.vulnerabilities = response
            .vulnerabilities
            .into_iter()
            .filter(|vulnerability| self.keeps(vulnerability.severity))
            .filter_map(|mut vulnerability| {
                vulnerability.components = self.components(vulnerability.components);
                (!vulnerability.components.is_empty()).then_some(vulnerability)
            })
            .collect();
        response.violations = response
            .violations
            .into_iter()
            .filter(|violation| self.keeps(violation.severity))
            .filter_map(|mut violation| {
                violation.components = self.components(violation.components);
                (!violation.components.is_empty()).then_some(violation)
            })
            .collect();
        response
    }
}
