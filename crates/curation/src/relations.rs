use crate::model::{PackageStatus, Relation};
use crate::pool::StatusMap;
use crate::url::Locator;
use depwarden_graph::{ComponentId, GraphNode};
use std::collections::HashSet;

struct Walk<'a> {
    statuses: &'a StatusMap,
    locator: &'a Locator,
    visited: HashSet<(String, String, String)>,
    out: Vec<PackageStatus>,
}

impl Walk<'_> {
    fn visit(&mut self, node: &GraphNode, depth: usize, parent: Option<&(String, String)>) {
        for child in &node.nodes {
            // Unlocatable packages were never probed, but their subtree was.
            let package = self.locator.locate(&child.id).ok();
            let frame = match (parent, &package) {
                (Some(frame), _) if depth > 0 => frame.clone(),
                (_, Some(package)) => (package.name.clone(), package.version.clone()),
                (_, None) => raw_frame(&child.id),
            };
            let key = (child.id.clone(), frame.0.clone(), frame.1.clone());
            if !self.visited.insert(key) {
                continue;
            }
            if let Some(status) = package
                .as_ref()
                .and_then(|package| self.statuses.get(&package.url))
            {
                self.out.push(PackageStatus {
                    parent_name: frame.0.clone(),
                    parent_version: frame.1.clone(),
                    relation: Relation::from_depth(depth + 1),
                    ..status.clone()
                });
            }
            self.visit(child, depth + 1, Some(&frame));
        }
    }
}

fn raw_frame(id: &str) -> (String, String) {
    match ComponentId::parse(id) {
        Ok(parsed) => (parsed.name, parsed.version.unwrap_or_default()),
        Err(_) => (id.to_string(), String::new()),
    }
}

/// Walks the full tree and emits one record per (blocked package, direct
/// dependency) pair, sorted by direct dependency name.
pub fn annotate_relations(
    tree: &GraphNode,
    statuses: &StatusMap,
    locator: &Locator,
) -> Vec<PackageStatus> {
    let mut walk = Walk {
        statuses,
        locator,
        visited: HashSet::new(),
        out: Vec::new(),
    };
    walk.visit(tree, 0, None);
    let mut out = walk.out;
    out.sort_by(|a, b| a.parent_name.cmp(&b.parent_name));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockingReason, Policy, BLOCKED};
    use depwarden_protocol::Technology;
    use pretty_assertions::assert_eq;

    fn locator() -> Locator {
        Locator::new(Technology::Npm, "https://host/art", "rt")
    }

    fn blocked(id: &str) -> (String, PackageStatus) {
        let package = locator().locate(id).unwrap();
        let status = PackageStatus {
            action: BLOCKED.into(),
            blocked_package_url: package.url.clone(),
            package_name: package.name,
            package_version: package.version,
            blocking_reason: BlockingReason::PolicyViolations,
            package_type: "npm".into(),
            policies: vec![Policy {
                policy: "p1".into(),
                condition: "c1".into(),
                ..Policy::default()
            }],
            ..PackageStatus::default()
        };
        (package.url, status)
    }

    #[test]
    fn blocked_transitive_names_its_direct_dependency() {
        let tree = GraphNode::with_children(
            "npm://root:0.0.1",
            vec![GraphNode::with_children(
                "npm://A:1",
                vec![GraphNode::new("npm://B:2")],
            )],
        );
        let statuses = StatusMap::from([blocked("npm://B:2")]);

        let records = annotate_relations(&tree, &statuses, &locator());
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.action, "blocked");
        assert_eq!(record.parent_name, "A");
        assert_eq!(record.parent_version, "1");
        assert_eq!(record.package_name, "B");
        assert_eq!(record.package_version, "2");
        assert_eq!(record.relation, Relation::Indirect);
        assert_eq!(record.blocking_reason, BlockingReason::PolicyViolations);
        assert_eq!(record.policies[0].policy, "p1");
        assert_eq!(record.policies[0].condition, "c1");
    }

    #[test]
    fn unlocatable_direct_dependency_still_names_blocked_grandchild() {
        let maven = Locator::new(Technology::Maven, "https://host/art", "maven-remote");
        let grandchild = maven.locate("gav://org.acme:lib:2.0").unwrap();
        let status = PackageStatus {
            action: BLOCKED.into(),
            blocked_package_url: grandchild.url.clone(),
            package_name: grandchild.name,
            package_version: grandchild.version,
            blocking_reason: BlockingReason::PolicyViolations,
            package_type: "maven".into(),
            ..PackageStatus::default()
        };
        // `gav://nogroup:1.0` has no group, so it has no download url.
        let tree = GraphNode::with_children(
            "gav://org.acme:app:0.1",
            vec![GraphNode::with_children(
                "gav://nogroup:1.0",
                vec![GraphNode::new("gav://org.acme:lib:2.0")],
            )],
        );
        let statuses = StatusMap::from([(grandchild.url, status)]);

        let records = annotate_relations(&tree, &statuses, &maven);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].parent_name, "nogroup");
        assert_eq!(records[0].parent_version, "1.0");
        assert_eq!(records[0].package_name, "org.acme:lib");
        assert_eq!(records[0].relation, Relation::Indirect);
    }

    #[test]
    fn direct_block_and_repeated_parents() {
        // root → x → shared, root → y → shared, root → shared, x → z → shared
        let shared = || GraphNode::new("npm://shared:1.0.0");
        let tree = GraphNode::with_children(
            "npm://root:0.0.1",
            vec![
                GraphNode::with_children(
                    "npm://x:1.0.0",
                    vec![
                        shared(),
                        GraphNode::with_children("npm://z:1.0.0", vec![shared()]),
                    ],
                ),
                GraphNode::with_children("npm://y:1.0.0", vec![shared()]),
                shared(),
            ],
        );
        let statuses = StatusMap::from([blocked("npm://shared:1.0.0")]);

        let records = annotate_relations(&tree, &statuses, &locator());
        let summary: Vec<(&str, Relation)> = records
            .iter()
            .map(|r| (r.parent_name.as_str(), r.relation))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("shared", Relation::Direct),
                ("x", Relation::Indirect),
                ("y", Relation::Indirect),
            ]
        );
    }
}
