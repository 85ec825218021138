//! # Depwarden Curation
//!
//! Asks the repository which packages of a resolved project its curation
//! policies block, and under which direct dependency each one is pulled in.
//!
//! ## Pipeline
//!
//! ```text
//! DependencyTrees
//!     │
//!     ├──> Locator: canonical id → download url
//!     │
//!     ├──> fetch_statuses (≤ P probes in flight)
//!     │      ├─ HEAD 2xx        → allowed
//!     │      ├─ HEAD 403 → GET  → errors envelope → PackageStatus
//!     │      └─ anything else   → per-node error, siblings continue
//!     │
//!     ├──> annotate_relations(tree): direct / indirect per parent
//!     │
//!     └──> render_table / render_json, keyed by project
//! ```

mod audit;
mod error;
mod model;
mod policy;
mod pool;
mod probe;
mod relations;
mod render;
mod url;

pub use audit::{is_curation_supported, project_key, CurationAudit, CurationResults};
pub use error::{CurationError, Result};
pub use model::{BlockingReason, PackageStatus, Policy, Relation, BLOCKED};
pub use policy::{extract_policies, CURATION_SENTINEL};
pub use pool::{fetch_statuses, StatusMap};
pub use probe::Prober;
pub use relations::annotate_relations;
pub use render::{headline, render_json, render_table, status_table, ProjectStatuses};
pub use url::{Locator, PackageRef};
