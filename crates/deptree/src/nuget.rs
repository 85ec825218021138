use crate::params::{DepTreeParams, ResolutionServer};
use crate::result::{accept_output, trees_from_modules, DependencyTrees, ModuleGraph};
use crate::runner::{CommandRunner, CommandSpec};
use crate::scratch::{is_skipped_dir, ScratchDir};
use crate::state::{AdapterRun, AdapterState};
use crate::template::escape_xml;
use crate::{DepTreeError, Result};
use depwarden_protocol::Technology;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub(crate) const NUGET_SCHEME: &str = "nuget://";
const CONFIG_FILE: &str = "NuGet.Config";
const SOURCE_NAME: &str = "depwarden";
const ASSETS_FILE: &str = "project.assets.json";

#[derive(Debug, Deserialize)]
struct AssetsFile {
    #[serde(default)]
    targets: BTreeMap<String, BTreeMap<String, TargetLibrary>>,
    project: AssetsProject,
}

#[derive(Debug, Deserialize)]
struct TargetLibrary {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct AssetsProject {
    version: Option<String>,
    restore: AssetsRestore,
    #[serde(default)]
    frameworks: BTreeMap<String, AssetsFramework>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetsRestore {
    project_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct AssetsFramework {
    #[serde(default)]
    dependencies: BTreeMap<String, serde_json::Value>,
}

fn nuget_id(name: &str, version: Option<&str>) -> String {
    match version.filter(|version| !version.is_empty()) {
        Some(version) => format!("{NUGET_SCHEME}{name}:{version}"),
        None => format!("{NUGET_SCHEME}{name}"),
    }
}

/// Builds one project's graph from its restore output. Package names are
/// matched case-insensitively the way NuGet does.
pub(crate) fn parse_assets(raw: &str, source_name: &str) -> Result<ModuleGraph> {
    let assets: AssetsFile =
        serde_json::from_str(raw).map_err(|err| DepTreeError::corrupt(source_name, err))?;
    let mut module = ModuleGraph::new(nuget_id(
        &assets.project.restore.project_name,
        assets.project.version.as_deref(),
    ));
    let root = module.root.clone();

    for (framework, libraries) in &assets.targets {
        // `net6.0/linux-x64` targets repeat the plain framework.
        if framework.contains('/') {
            continue;
        }
        let mut resolved: HashMap<String, String> = HashMap::new();
        for key in libraries.keys() {
            if let Some((name, version)) = key.split_once('/') {
                resolved.insert(name.to_lowercase(), nuget_id(name, Some(version)));
            }
        }
        for (key, library) in libraries {
            if library.kind != "package" {
                continue;
            }
            let Some(id) = resolved.get(&key.split('/').next().unwrap_or(key).to_lowercase())
            else {
                continue;
            };
            module.graph.add_node(id);
            for dependency in library.dependencies.keys() {
                if let Some(child) = resolved.get(&dependency.to_lowercase()) {
                    module.graph.add_dependency(id, child);
                }
            }
        }
        let direct = assets
            .project
            .frameworks
            .iter()
            .filter(|(name, _)| framework_matches(name, framework))
            .flat_map(|(_, declared)| declared.dependencies.keys());
        for name in direct {
            if let Some(id) = resolved.get(&name.to_lowercase()) {
                module.graph.add_dependency(&root, id);
            }
        }
    }
    Ok(module)
}

/// `net6.0` in `project.frameworks` pairs with `net6.0` or the long
/// `.NETCoreApp,Version=v6.0` target name written by older SDKs.
fn framework_matches(declared: &str, target: &str) -> bool {
    if declared.eq_ignore_ascii_case(target) {
        return true;
    }
    let Some((_, version)) = target.split_once(",Version=v") else {
        return false;
    };
    declared.ends_with(version)
}

fn nuget_config(server: &ResolutionServer) -> String {
    let credentials = match server.login() {
        Some((user, secret)) => format!(
            r#"
  <packageSourceCredentials>
    <{SOURCE_NAME}>
      <add key="Username" value="{}" />
      <add key="ClearTextPassword" value="{}" />
    </{SOURCE_NAME}>
  </packageSourceCredentials>"#,
            escape_xml(user),
            escape_xml(secret)
        ),
        None => String::new(),
    };
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<configuration>
  <packageSources>
    <clear />
    <add key="{SOURCE_NAME}" value="{}" protocolVersion="3" />
  </packageSources>{credentials}
</configuration>
"#,
        escape_xml(&format!("{}/index.json", server.api_url("nuget/v3")))
    )
}

fn project_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut projects = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_skipped_dir(entry));
    for entry in walker {
        let entry = entry.map_err(|err| DepTreeError::Other(err.to_string()))?;
        let is_project = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csproj"));
        if entry.file_type().is_file() && is_project {
            projects.push(entry.into_path());
        }
    }
    Ok(projects)
}

fn assets_path(project_file: &Path) -> Option<PathBuf> {
    project_file
        .parent()
        .map(|dir| dir.join("obj").join(ASSETS_FILE))
}

pub(crate) fn read_assets(projects: &[PathBuf]) -> Result<Vec<ModuleGraph>> {
    let mut modules = Vec::new();
    for project in projects {
        let Some(path) = assets_path(project).filter(|path| path.is_file()) else {
            log::warn!("No {ASSETS_FILE} for {}", project.display());
            continue;
        };
        let raw = fs::read_to_string(&path)?;
        modules.push(parse_assets(&raw, &path.display().to_string())?);
    }
    if modules.is_empty() {
        return Err(DepTreeError::corrupt(ASSETS_FILE, "no restored project found"));
    }
    Ok(modules)
}

pub(crate) async fn build(
    params: &DepTreeParams,
    runner: &dyn CommandRunner,
    run: &mut AdapterRun,
) -> Result<DependencyTrees> {
    let original_projects = project_files(&params.working_dir)?;
    if original_projects.is_empty() {
        return Err(DepTreeError::NoProject(params.working_dir.clone()));
    }
    let restored = original_projects
        .iter()
        .all(|project| assets_path(project).is_some_and(|path| path.is_file()));
    if restored && params.server.is_none() {
        log::debug!("Reading existing restore output");
        run.advance(AdapterState::ScratchReady);
        let modules = read_assets(&original_projects)?;
        run.advance(AdapterState::ResolverRan);
        run.advance(AdapterState::Parsed);
        return trees_from_modules(Technology::Nuget, modules, false, None);
    }

    let scratch = ScratchDir::new("nuget")?;
    let copy = scratch.copy_project(&params.working_dir, "project")?;
    run.advance(AdapterState::ScratchReady);

    let mut restore = params
        .secrets()
        .into_iter()
        .fold(CommandSpec::new("dotnet", &copy), |spec, secret| {
            spec.secret(secret)
        })
        .arg("restore");
    if let Some(server) = &params.server {
        let config = scratch.write_private(CONFIG_FILE, &nuget_config(server))?;
        restore = restore
            .arg("--configfile")
            .arg(config.display().to_string());
        run.advance(AdapterState::SettingsWritten);
    }
    let output = runner.run(&restore).await?;
    run.advance(AdapterState::ResolverRan);

    let projects = project_files(&copy)?;
    let (modules, resolver_error) = accept_output(&restore, output, |_| read_assets(&projects))?;
    run.advance(AdapterState::Parsed);
    trees_from_modules(Technology::Nuget, modules, false, resolver_error)
}
