//! # Depwarden Graph
//!
//! Canonical dependency graph shared by every resolver adapter.
//!
//! ## Architecture
//!
//! ```text
//! resolver output
//!     │
//!     ├──> DependencyGraph (petgraph)
//!     │      ├─ Nodes: canonical ids + type tags
//!     │      └─ Edges: parent → child, insertion ordered
//!     │
//!     ├──> build_tree(graph, root)
//!     │      ├─ ancestor list cuts cycles
//!     │      └─ unique set: id → merged tags
//!     │
//!     └──> flatten_graph(tree)
//!            └─ virtual root, one hop, for the scan service
//! ```

mod dep_graph;
mod error;
mod id;
mod tree;

pub use dep_graph::{DepNode, DependencyGraph};
pub use error::{GraphError, Result};
pub use id::ComponentId;
pub use tree::{
    build_tree, flatten_graph, flatten_unique, merge_unique, unique_deps, GraphNode, UniqueDeps,
    FLAT_ROOT_ID, MAX_UNIQUE_APPEARANCES,
};
