use crate::runner::{CommandOutput, CommandSpec};
use crate::Result;
use depwarden_graph::{build_tree, merge_unique, DependencyGraph, GraphNode, UniqueDeps};
use depwarden_protocol::Technology;

/// Tag the resolvers put on test-only dependencies.
pub const TEST_TAG: &str = "test";

/// Parsed resolver output for one module.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    pub root: String,
    pub graph: DependencyGraph,
}

impl ModuleGraph {
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        let mut graph = DependencyGraph::new();
        graph.add_node(&root);
        Self { root, graph }
    }
}

/// Trees of every module of a project plus their concatenated unique set.
#[derive(Debug, Clone)]
pub struct DependencyTrees {
    pub technology: Technology,
    pub trees: Vec<GraphNode>,
    pub unique: UniqueDeps,
    /// Resolver failure that was recovered from because output still parsed.
    pub resolver_error: Option<String>,
}

impl DependencyTrees {
    pub fn node_count(&self) -> usize {
        self.trees.iter().map(GraphNode::node_count).sum()
    }
}

pub(crate) fn trees_from_modules(
    technology: Technology,
    modules: Vec<ModuleGraph>,
    exclude_test_deps: bool,
    resolver_error: Option<String>,
) -> Result<DependencyTrees> {
    let mut trees = Vec::with_capacity(modules.len());
    let mut unique_sets = Vec::with_capacity(modules.len());
    for module in modules {
        let graph = if exclude_test_deps {
            module.graph.without_only_tagged(TEST_TAG, &module.root)
        } else {
            module.graph
        };
        let (tree, unique) = build_tree(&graph, &module.root)?;
        trees.push(tree);
        unique_sets.push(unique);
    }
    let unique = merge_unique(unique_sets);
    log::debug!(
        "{technology}: {} module(s), {} unique dependencies",
        trees.len(),
        unique.len()
    );
    Ok(DependencyTrees {
        technology,
        trees,
        unique,
        resolver_error,
    })
}

/// Applies the partial-output policy: a failed resolver run is kept only when
/// its output still parses into at least one module with a dependency.
pub(crate) fn accept_output<T: AsRef<[ModuleGraph]>>(
    spec: &CommandSpec,
    output: CommandOutput,
    parse: impl FnOnce(&CommandOutput) -> Result<T>,
) -> Result<(T, Option<String>)> {
    if output.is_success() {
        return parse(&output).map(|parsed| (parsed, None));
    }
    match parse(&output) {
        Ok(parsed) if modules_have_nodes(parsed.as_ref()) => {
            let message = format!("{} failed with {}", spec.program, output.code_label());
            log::warn!("{message}; keeping the partial dependency graph");
            Ok((parsed, Some(message)))
        }
        _ => {
            log::warn!("{} failed with {}", spec.program, output.code_label());
            Err(output.into_error(spec))
        }
    }
}

fn modules_have_nodes(modules: &[ModuleGraph]) -> bool {
    modules.iter().any(|module| module.graph.len() > 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DepTreeError;

    fn module() -> ModuleGraph {
        let mut module = ModuleGraph::new("npm://app:1.0.0");
        module.graph.add_dependency("npm://app:1.0.0", "npm://a:1");
        module.graph.add_dependency("npm://app:1.0.0", "npm://jest:29");
        module.graph.add_types("npm://jest:29", [TEST_TAG]);
        module
    }

    #[test]
    fn test_only_nodes_can_be_excluded() {
        let trees = trees_from_modules(Technology::Npm, vec![module()], true, None).unwrap();
        assert_eq!(trees.trees[0].nodes.len(), 1);
        assert!(!trees.unique.contains_key("npm://jest:29"));

        let trees = trees_from_modules(Technology::Npm, vec![module()], false, None).unwrap();
        assert!(trees.unique.contains_key("npm://jest:29"));
    }

    #[test]
    fn partial_output_with_nodes_is_kept() {
        let spec = CommandSpec::new("npm", "/tmp");
        let output = CommandOutput {
            status: Some(1),
            stdout: "tree".into(),
            stderr: "ERR! missing peer".into(),
        };
        let (modules, error) = accept_output(&spec, output, |_| Ok(vec![module()])).unwrap();
        assert_eq!(modules.len(), 1);
        assert_eq!(error.as_deref(), Some("npm failed with exit code 1"));
    }

    #[test]
    fn partial_output_without_nodes_fails() {
        let spec = CommandSpec::new("npm", "/tmp");
        let output = CommandOutput::failure(1, "ERR! boom");
        let err = accept_output(&spec, output, |_| Ok(vec![ModuleGraph::new("npm://app:1")]))
            .unwrap_err();
        assert!(matches!(err, DepTreeError::ResolverFailed { .. }));
        assert!(err.to_string().contains("ERR! boom"));
    }
}
