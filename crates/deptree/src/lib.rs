//! # Depwarden Dependency Trees
//!
//! Runs each ecosystem's own resolver out of process and turns what it prints
//! into canonical dependency graphs.
//!
//! ## Architecture
//!
//! ```text
//! working dir
//!     │
//!     ├──> detect_technologies (filesystem signatures)
//!     │
//!     └──> build_dependency_tree(technology, params, runner)
//!            ├─ ScratchDir: private settings (0600), plugin output
//!            ├─ ConfigBackup: project config moved aside, restored on drop
//!            ├─ plugin cache (maven-dep-tree, gradle-dep-tree) under FileLock
//!            ├─ CommandRunner ──> mvn | gradle | npm | yarn | go | pip | dotnet
//!            ├─ parser ──> ModuleGraph per module
//!            └─ DependencyTrees: GraphNode per module + merged UniqueDeps
//! ```
//!
//! Each run walks [`AdapterState`] from `init` to `cleanup`.

mod builder;
mod detect;
mod error;
mod go;
mod java;
mod npm;
mod nuget;
mod params;
mod plugins;
mod python;
mod result;
mod runner;
mod scratch;
mod state;
mod template;
mod yarn;

#[cfg(test)]
mod testing;

pub use builder::build_dependency_tree;
pub use detect::{detect_in_dir, detect_technologies, DetectedTechnologies};
pub use error::{DepTreeError, Result};
pub use params::{DepTreeParams, ResolutionServer, DEFAULT_RELEASES_URL};
pub use plugins::{ensure_plugin, Plugin, GRADLE_DEP_TREE, MAVEN_DEP_TREE};
pub use result::{DependencyTrees, ModuleGraph, TEST_TAG};
pub use runner::{CommandOutput, CommandRunner, CommandSpec, ProcessRunner};
pub use scratch::{ConfigBackup, ScratchDir};
pub use state::{AdapterRun, AdapterState};
