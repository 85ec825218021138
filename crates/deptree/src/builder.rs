use crate::params::DepTreeParams;
use crate::result::DependencyTrees;
use crate::runner::CommandRunner;
use crate::state::AdapterRun;
use crate::{go, java, npm, nuget, python, yarn, DepTreeError, Result};
use depwarden_protocol::Technology;

/// Resolves the dependency trees of the project in `params.working_dir`.
///
/// Every call walks one adapter run; its history is logged at debug once the
/// run is over, successful or not.
pub async fn build_dependency_tree(
    technology: Technology,
    params: &DepTreeParams,
    runner: &dyn CommandRunner,
) -> Result<DependencyTrees> {
    log::info!(
        "Calculating {technology} dependencies in {}",
        params.working_dir.display()
    );
    let mut run = AdapterRun::start(technology);
    let result = dispatch(technology, params, runner, &mut run).await;
    run.finish(&result);
    log::debug!(
        "{technology}: {}",
        run.history()
            .iter()
            .map(|state| state.as_str())
            .collect::<Vec<_>>()
            .join(" -> ")
    );
    match &result {
        Ok(trees) => {
            if let Some(err) = &trees.resolver_error {
                log::warn!("{technology}: kept a partial dependency tree after {err}");
            }
            log::info!(
                "{technology}: {} tree(s), {} unique dependencies",
                trees.trees.len(),
                trees.unique.len()
            );
        }
        Err(err) => log::debug!("{technology}: {err}"),
    }
    result
}

async fn dispatch(
    technology: Technology,
    params: &DepTreeParams,
    runner: &dyn CommandRunner,
    run: &mut AdapterRun,
) -> Result<DependencyTrees> {
    match technology {
        Technology::Maven => java::maven::build(params, runner, run).await,
        Technology::Gradle => java::gradle::build(params, runner, run).await,
        Technology::Npm => npm::build(params, runner, run).await,
        Technology::Yarn => yarn::build(params, runner, run).await,
        Technology::Go => go::build(params, runner, run).await,
        Technology::Pip | Technology::Pipenv | Technology::Poetry => {
            python::build(technology, params, runner, run).await
        }
        Technology::Nuget => nuget::build(params, runner, run).await,
        Technology::Docker => Err(DepTreeError::Unsupported(technology)),
    }
}
