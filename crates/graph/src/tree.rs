use crate::{DependencyGraph, GraphError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// An id expanded this many times is attached without children afterwards.
/// Its subtree has been walked already, so the unique set is unaffected.
pub const MAX_UNIQUE_APPEARANCES: usize = 10;

/// Id of the virtual root produced by [`flatten_graph`].
pub const FLAT_ROOT_ID: &str = "root";

/// Canonical id → merged type tags.
pub type UniqueDeps = BTreeMap<String, BTreeSet<String>>;

/// One vertex of a dependency tree, in the shape the scan service accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    #[serde(rename = "component_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<GraphNode>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_children(id: impl Into<String>, nodes: Vec<GraphNode>) -> Self {
        Self {
            id: id.into(),
            types: Vec::new(),
            nodes,
        }
    }

    /// Number of vertices in the tree, root included.
    pub fn node_count(&self) -> usize {
        1 + self.nodes.iter().map(GraphNode::node_count).sum::<usize>()
    }

    /// Every root-to-node path ending at `target`, as id lists.
    pub fn paths_to(&self, target: &str) -> Vec<Vec<String>> {
        let mut paths = Vec::new();
        let mut current = Vec::new();
        collect_paths(self, target, &mut current, &mut paths);
        paths
    }

    /// Visits every root-to-leaf path.
    pub fn for_each_leaf_path(&self, visit: &mut impl FnMut(&[&GraphNode])) {
        fn walk<'a>(
            node: &'a GraphNode,
            path: &mut Vec<&'a GraphNode>,
            visit: &mut impl FnMut(&[&GraphNode]),
        ) {
            path.push(node);
            if node.nodes.is_empty() {
                visit(path);
            }
            for child in &node.nodes {
                walk(child, path, visit);
            }
            path.pop();
        }
        let mut path = Vec::new();
        walk(self, &mut path, visit);
    }
}

fn collect_paths(
    node: &GraphNode,
    target: &str,
    current: &mut Vec<String>,
    paths: &mut Vec<Vec<String>>,
) {
    current.push(node.id.clone());
    if node.id == target {
        paths.push(current.clone());
    }
    for child in &node.nodes {
        collect_paths(child, target, current, paths);
    }
    current.pop();
}

struct TreeBuilder<'g> {
    graph: &'g DependencyGraph,
    unique: UniqueDeps,
    appearances: HashMap<&'g str, usize>,
}

impl<'g> TreeBuilder<'g> {
    fn build(&mut self, id: &'g str, ancestors: &mut Vec<&'g str>) -> GraphNode {
        let types: Vec<String> = self
            .graph
            .types(id)
            .map(|types| types.iter().cloned().collect())
            .unwrap_or_default();
        self.unique
            .entry(id.to_string())
            .or_default()
            .extend(types.iter().cloned());

        let mut node = GraphNode {
            id: id.to_string(),
            types,
            nodes: Vec::new(),
        };

        let seen = self.appearances.entry(id).or_insert(0);
        *seen += 1;
        if *seen > MAX_UNIQUE_APPEARANCES {
            return node;
        }

        ancestors.push(id);
        for child in self.graph.children(id) {
            if ancestors.contains(&child) {
                log::debug!("Cycle suppressed: {id} -> {child}");
                continue;
            }
            node.nodes.push(self.build(child, ancestors));
        }
        ancestors.pop();
        node
    }
}

/// Builds the tree rooted at `root` and the unique set of every id reached.
///
/// A child that already appears on the path from the root is not attached,
/// so every root-to-leaf path has distinct ids.
pub fn build_tree(graph: &DependencyGraph, root: &str) -> Result<(GraphNode, UniqueDeps)> {
    let Some(root) = graph.id_ref(root) else {
        return Err(GraphError::NodeNotFound(root.to_string()));
    };
    let mut builder = TreeBuilder {
        graph,
        unique: UniqueDeps::new(),
        appearances: HashMap::new(),
    };
    let mut ancestors = Vec::new();
    let tree = builder.build(root, &mut ancestors);
    Ok((tree, builder.unique))
}

/// Unique set of an already built tree.
pub fn unique_deps(tree: &GraphNode) -> UniqueDeps {
    fn walk(node: &GraphNode, unique: &mut UniqueDeps) {
        unique
            .entry(node.id.clone())
            .or_default()
            .extend(node.types.iter().cloned());
        for child in &node.nodes {
            walk(child, unique);
        }
    }
    let mut unique = UniqueDeps::new();
    walk(tree, &mut unique);
    unique
}

/// One-hop graph: a virtual root whose children are every distinct id of the
/// tree, each carrying its merged types and no children.
pub fn flatten_graph(tree: &GraphNode) -> GraphNode {
    flatten_unique(&unique_deps(tree))
}

pub fn flatten_unique(unique: &UniqueDeps) -> GraphNode {
    GraphNode::with_children(
        FLAT_ROOT_ID,
        unique
            .iter()
            .map(|(id, types)| GraphNode {
                id: id.clone(),
                types: types.iter().cloned().collect(),
                nodes: Vec::new(),
            })
            .collect(),
    )
}

/// Concatenates per-module unique sets; ids shared by modules merge their
/// tags.
pub fn merge_unique<I>(sets: I) -> UniqueDeps
where
    I: IntoIterator<Item = UniqueDeps>,
{
    let mut merged = UniqueDeps::new();
    for set in sets {
        for (id, types) in set {
            merged.entry(id).or_default().extend(types);
        }
    }
    merged
}
