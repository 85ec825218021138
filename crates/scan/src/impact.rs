use crate::model::{Component, ImpactPathNode, ScanResponse};
use depwarden_graph::GraphNode;
use std::collections::BTreeMap;

/// Impact paths kept per component.
pub const MAX_IMPACT_PATHS: usize = 20;

fn fill(components: &mut BTreeMap<String, Component>, trees: &[GraphNode]) {
    for (id, component) in components.iter_mut() {
        if !component.impact_paths.is_empty() {
            continue;
        }
        component.impact_paths = trees
            .iter()
            .flat_map(|tree| tree.paths_to(id))
            .take(MAX_IMPACT_PATHS)
            .map(|path| {
                path.into_iter()
                    .map(|component_id| ImpactPathNode {
                        component_id,
                        full_path: String::new(),
                    })
                    .collect()
            })
            .collect();
    }
}

/// Fills missing impact paths from the trees the graph was flattened from.
pub fn attach_impact_paths(response: &mut ScanResponse, trees: &[GraphNode]) {
    for vulnerability in &mut response.vulnerabilities {
        fill(&mut vulnerability.components, trees);
    }
    for violation in &mut response.violations {
        fill(&mut violation.components, trees);
    }
    for license in &mut response.licenses {
        fill(&mut license.components, trees);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Vulnerability;
    use pretty_assertions::assert_eq;

    #[test]
    fn paths_come_from_every_tree() {
        let tree_a = GraphNode::with_children(
            "npm://app:1.0.0",
            vec![GraphNode::with_children(
                "npm://express:4.0.0",
                vec![GraphNode::new("npm://qs:6.0.0")],
            )],
        );
        let tree_b = GraphNode::with_children("npm://cli:1.0.0", vec![GraphNode::new("npm://qs:6.0.0")]);
        let mut response = ScanResponse {
            vulnerabilities: vec![Vulnerability {
                components: BTreeMap::from([("npm://qs:6.0.0".to_string(), Component::default())]),
                ..Vulnerability::default()
            }],
            ..ScanResponse::default()
        };
        attach_impact_paths(&mut response, &[tree_a, tree_b]);

        let paths: Vec<Vec<&str>> = response.vulnerabilities[0].components["npm://qs:6.0.0"]
            .impact_paths
            .iter()
            .map(|path| path.iter().map(|node| node.component_id.as_str()).collect())
            .collect();
        assert_eq!(
            paths,
            vec![
                vec!["npm://app:1.0.0", "npm://express:4.0.0", "npm://qs:6.0.0"],
                vec!["npm://cli:1.0.0", "npm://qs:6.0.0"],
            ]
        );
    }
}
