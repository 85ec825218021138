//! Output of the maven-dep-tree and gradle-dep-tree plugins: a file listing
//! one JSON document per module, each `{root, nodes: {gav: {children}}}`.

use crate::result::ModuleGraph;
use crate::{DepTreeError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub(crate) const GAV_SCHEME: &str = "gav://";

#[derive(Debug, Deserialize)]
struct ModuleDepTree {
    root: String,
    #[serde(default)]
    nodes: BTreeMap<String, DepTreeNode>,
}

#[derive(Debug, Default, Deserialize)]
struct DepTreeNode {
    #[serde(default)]
    children: Vec<String>,
    /// Scopes (Maven) or configurations (Gradle) the node was reached through.
    #[serde(default, alias = "configurations", alias = "scopes")]
    types: Vec<String>,
}

fn gav(id: &str) -> String {
    format!("{GAV_SCHEME}{id}")
}

/// Parses one module document.
pub(crate) fn parse_module(raw: &str, source_name: &str) -> Result<ModuleGraph> {
    let tree: ModuleDepTree =
        serde_json::from_str(raw).map_err(|err| DepTreeError::corrupt(source_name, err))?;
    if tree.root.trim().is_empty() {
        return Err(DepTreeError::corrupt(source_name, "empty root"));
    }
    let mut module = ModuleGraph::new(gav(&tree.root));
    for (id, node) in &tree.nodes {
        let id = gav(id);
        module.graph.add_types(&id, node.types.iter().cloned());
        for child in &node.children {
            module.graph.add_dependency(&id, &gav(child));
        }
    }
    Ok(module)
}

/// Reads the plugin's output file and every module document it points at.
pub(crate) fn read_output_file(path: &Path) -> Result<Vec<ModuleGraph>> {
    let listing = fs::read_to_string(path).map_err(|err| {
        DepTreeError::corrupt(path.display().to_string(), format!("unreadable: {err}"))
    })?;
    let mut modules = Vec::new();
    for line in listing.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let raw = fs::read_to_string(line)
            .map_err(|err| DepTreeError::corrupt(line, format!("unreadable: {err}")))?;
        modules.push(parse_module(&raw, line)?);
    }
    if modules.is_empty() {
        return Err(DepTreeError::corrupt(
            path.display().to_string(),
            "no module trees listed",
        ));
    }
    Ok(modules)
}
