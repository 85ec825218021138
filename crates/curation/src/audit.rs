use crate::pool::fetch_statuses;
use crate::probe::Prober;
use crate::relations::annotate_relations;
use crate::render::ProjectStatuses;
use crate::url::Locator;
use crate::{CurationError, Result};
use depwarden_deptree::{
    build_dependency_tree, detect_in_dir, CommandRunner, DepTreeParams, DependencyTrees,
};
use depwarden_graph::ComponentId;
use depwarden_http::HttpClient;
use depwarden_protocol::{Provenance, ServerDetails, Settings, Technology};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Technologies the curation service can be asked about.
pub fn is_curation_supported(technology: Technology) -> bool {
    technology != Technology::Docker
}

/// Everything a curation audit found, and what went wrong on the way.
#[derive(Debug, Default)]
pub struct CurationResults {
    pub projects: ProjectStatuses,
    pub errors: Vec<CurationError>,
}

impl CurationResults {
    pub fn blocked_count(&self) -> usize {
        self.projects.values().map(Vec::len).sum()
    }

    /// Takes the collected errors as one.
    pub fn take_error(&mut self) -> Option<CurationError> {
        CurationError::join(std::mem::take(&mut self.errors))
    }
}

/// `name:version` of a tree root, the name alone when it has no version.
pub fn project_key(root_id: &str) -> String {
    match ComponentId::parse(root_id) {
        Ok(id) => match id.version {
            Some(version) => format!("{}:{version}", id.name),
            None => id.name,
        },
        Err(_) => root_id.to_string(),
    }
}

/// Runs the curation audit: resolve, probe, annotate.
pub struct CurationAudit<'a> {
    http: HttpClient,
    runner: &'a dyn CommandRunner,
    artifactory_url: String,
    repo: String,
    threads: usize,
    provenance: Provenance,
}

impl<'a> CurationAudit<'a> {
    pub fn new(
        http: HttpClient,
        runner: &'a dyn CommandRunner,
        server: &ServerDetails,
        repo: Option<&str>,
    ) -> Result<Self> {
        let artifactory_url = server.artifactory_url().ok_or_else(|| {
            CurationError::ConfigMissing(
                "no server is configured; set DEPWARDEN_URL or pass --url".to_string(),
            )
        })?;
        let repo = repo
            .map(str::trim)
            .filter(|repo| !repo.is_empty())
            .ok_or_else(|| {
                CurationError::ConfigMissing(
                    "no repository to resolve from; pass --repo".to_string(),
                )
            })?;
        Ok(Self {
            http,
            runner,
            artifactory_url,
            repo: repo.to_string(),
            threads: Settings::default().threads,
            provenance: Provenance::default(),
        })
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// Audits every working directory. An unsupported technology stops the
    /// audit; other failures are collected and the remaining directories
    /// still run.
    pub async fn run(
        &self,
        params: &DepTreeParams,
        working_dirs: &[PathBuf],
    ) -> Result<CurationResults> {
        let mut results = CurationResults::default();
        let dirs: Vec<PathBuf> = if working_dirs.is_empty() {
            vec![params.working_dir.clone()]
        } else {
            working_dirs.to_vec()
        };
        for dir in &dirs {
            log::info!("Running curation audit on project: {}", dir.display());
            match self.audit_dir(params, dir, &mut results).await {
                Ok(()) => {}
                Err(err @ CurationError::Unsupported(_)) => return Err(err),
                Err(err) => results.errors.push(err),
            }
        }
        Ok(results)
    }

    async fn audit_dir(
        &self,
        params: &DepTreeParams,
        dir: &Path,
        results: &mut CurationResults,
    ) -> Result<()> {
        let technologies = detect_in_dir(dir)?;
        let unsupported = technologies
            .iter()
            .copied()
            .find(|technology| !is_curation_supported(*technology));
        if let Some(unsupported) = unsupported {
            return Err(CurationError::Unsupported(unsupported));
        }
        let params = params.with_working_dir(dir);
        for technology in technologies {
            let trees = build_dependency_tree(technology, &params, self.runner).await?;
            self.audit_trees(&trees, results).await?;
        }
        Ok(())
    }

    /// Probes the unique set of `trees` once and annotates every tree of
    /// it. Probe failures land in `results.errors`.
    pub async fn audit_trees(
        &self,
        trees: &DependencyTrees,
        results: &mut CurationResults,
    ) -> Result<()> {
        let technology = trees.technology;
        if !is_curation_supported(technology) {
            return Err(CurationError::Unsupported(technology));
        }
        if trees.trees.iter().all(|tree| tree.nodes.is_empty()) {
            return Err(CurationError::NoDependencies(technology));
        }
        let locator = Locator::new(technology, &self.artifactory_url, &self.repo);
        let prober = Prober::new(self.http.clone(), locator.clone())
            .with_provenance(self.provenance.clone());
        let prober = Arc::new(prober);
        // Tree roots are the projects themselves.
        let roots: BTreeSet<String> = trees.trees.iter().map(|tree| tree.id.clone()).collect();
        let ids: Vec<String> = trees.unique.keys().cloned().collect();
        log::info!(
            "Fetching curation status of {} {} packages",
            ids.iter().filter(|id| !roots.contains(*id)).count(),
            technology.formal_name()
        );
        let (statuses, errors) = fetch_statuses(prober, ids, &roots, self.threads).await;
        results.errors.extend(errors);

        for tree in &trees.trees {
            let key = project_key(&tree.id);
            let records = annotate_relations(tree, &statuses, &locator);
            log::info!("Found {} blocked packages for project {key}", records.len());
            results.projects.entry(key).or_default().extend(records);
        }
        Ok(())
    }
}
