//! # Depwarden Scan
//!
//! Vulnerability audit of resolved dependency graphs.
//!
//! ## Architecture
//!
//! ```text
//! flattened graph
//!     │
//!     ├──> ScanGraphClient
//!     │      ├─ POST api/v1/scan/graph      → scan_id
//!     │      └─ GET  api/v1/scan/graph/<id> (202 → poll again)
//!     │
//!     ├──> attach_impact_paths(trees)
//!     ├──> ScanFilter (min severity, fixable only)
//!     │
//!     └──> AuditResults
//!            ├─ SimpleJsonResults ──> render_tables
//!            └─ to_sarif (2.1.0)
//! ```

mod client;
mod error;
mod filter;
mod impact;
mod model;
mod results;
mod sarif;
mod simple_json;
mod table;

pub use client::{ScanGraphClient, ScanGraphParams};
pub use error::{Result, ScanError};
pub use filter::ScanFilter;
pub use impact::{attach_impact_paths, MAX_IMPACT_PATHS};
pub use model::{
    Component, Cve, ImpactPathNode, License, ScanResponse, Severity, Violation, Vulnerability,
};
pub use results::{descriptor_file, AuditResults, ScanFailure, TechnologyScan};
pub use sarif::{level, security_severity, to_sarif, SarifLog, SARIF_SCHEMA, SARIF_VERSION};
pub use simple_json::{
    CveRow, ImpactedPackage, LicenseRow, Package, SimpleJsonResults, VulnerabilityRow,
};
pub use table::render_tables;
