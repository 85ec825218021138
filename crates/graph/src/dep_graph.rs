use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeSet, HashMap};

/// Resolver output for one module: every id with its type tags and ordered
/// children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepNode {
    pub id: String,
    pub types: BTreeSet<String>,
}

/// Dependency graph keyed by canonical id.
///
/// Children keep insertion order and a child appears at most once per
/// parent. Cycles are allowed here; [`crate::build_tree`] cuts them.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<DepNode, ()>,
    index: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Returns the node for `id`, inserting it when missing.
    pub fn add_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(DepNode {
            id: id.to_string(),
            types: BTreeSet::new(),
        });
        self.index.insert(id.to_string(), idx);
        idx
    }

    pub fn add_types<I, S>(&mut self, id: &str, types: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let idx = self.add_node(id);
        self.graph[idx].types.extend(types.into_iter().map(Into::into));
    }

    /// Adds `parent → child`; duplicates and self-edges are ignored.
    pub fn add_dependency(&mut self, parent: &str, child: &str) {
        let from = self.add_node(parent);
        let to = self.add_node(child);
        if from == to || self.graph.contains_edge(from, to) {
            return;
        }
        self.graph.add_edge(from, to, ());
    }

    /// The stored copy of `id`, borrowed from the graph.
    pub fn id_ref(&self, id: &str) -> Option<&str> {
        self.index.get_key_value(id).map(|(key, _)| key.as_str())
    }

    pub fn types(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.index.get(id).map(|&idx| &self.graph[idx].types)
    }

    /// Children of `id` in the order they were added.
    pub fn children(&self, id: &str) -> Vec<&str> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self
            .graph
            .edges(idx)
            .map(|edge| (edge.id().index(), edge.target()))
            .collect();
        edges.sort_unstable_by_key(|(order, _)| *order);
        edges
            .into_iter()
            .map(|(_, target)| self.graph[target].id.as_str())
            .collect()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.graph.node_weights().map(|node| node.id.as_str())
    }

    pub fn has_cycle(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Drops every node tagged only with `tag` (and the edges touching it).
    /// The root is never removed.
    pub fn without_only_tagged(&self, tag: &str, root: &str) -> DependencyGraph {
        let keep = |node: &DepNode| {
            node.id == root || !(node.types.len() == 1 && node.types.contains(tag))
        };
        let mut filtered = DependencyGraph::new();
        for node in self.graph.node_weights().filter(|node| keep(node)) {
            filtered.add_types(&node.id, node.types.iter().cloned());
        }
        for node in self.graph.node_weights().filter(|node| keep(node)) {
            for child in self.children(&node.id) {
                if filtered.contains(child) {
                    filtered.add_dependency(&node.id, child);
                }
            }
        }
        filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_keep_insertion_order_without_duplicates() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("root", "c");
        graph.add_dependency("root", "a");
        graph.add_dependency("root", "c");
        graph.add_dependency("root", "b");
        graph.add_dependency("root", "root");
        assert_eq!(graph.children("root"), vec!["c", "a", "b"]);
        assert_eq!(graph.len(), 4);
    }

    #[test]
    fn types_accumulate() {
        let mut graph = DependencyGraph::new();
        graph.add_types("a", ["compile"]);
        graph.add_types("a", ["test", "compile"]);
        let types: Vec<_> = graph.types("a").expect("node").iter().cloned().collect();
        assert_eq!(types, vec!["compile".to_string(), "test".to_string()]);
    }

    #[test]
    fn detects_cycles() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("a", "b");
        assert!(!graph.has_cycle());
        graph.add_dependency("b", "a");
        assert!(graph.has_cycle());
    }

    #[test]
    fn test_only_nodes_are_filtered() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("root", "lib");
        graph.add_dependency("root", "junit");
        graph.add_dependency("junit", "hamcrest");
        graph.add_types("lib", ["compile"]);
        graph.add_types("junit", ["test"]);
        graph.add_types("hamcrest", ["test", "compile"]);
        let filtered = graph.without_only_tagged("test", "root");
        assert_eq!(filtered.children("root"), vec!["lib"]);
        assert!(filtered.contains("hamcrest"));
        assert!(!filtered.contains("junit"));
    }
}
