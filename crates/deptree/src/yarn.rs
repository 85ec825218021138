use crate::npm::{npm_id, npmrc};
use crate::params::DepTreeParams;
use crate::result::{accept_output, trees_from_modules, DependencyTrees, ModuleGraph};
use crate::runner::{run_checked, CommandRunner, CommandSpec};
use crate::scratch::{ConfigBackup, ScratchDir};
use crate::state::{AdapterRun, AdapterState};
use crate::template::basic_auth;
use crate::{DepTreeError, Result};
use depwarden_protocol::Technology;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum YarnFlavor {
    Classic,
    Berry,
}

impl YarnFlavor {
    pub(crate) fn from_version(raw: &str) -> Result<Self> {
        let major = raw
            .trim()
            .split('.')
            .next()
            .and_then(|major| major.parse::<u32>().ok())
            .ok_or_else(|| DepTreeError::corrupt("yarn --version", raw.trim()))?;
        Ok(if major < 2 {
            YarnFlavor::Classic
        } else {
            YarnFlavor::Berry
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct PackageJson {
    name: Option<String>,
    version: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "devDependencies")]
    dev_dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "optionalDependencies")]
    optional_dependencies: BTreeMap<String, String>,
}

impl PackageJson {
    fn read(dir: &Path) -> Result<Self> {
        let path = dir.join("package.json");
        let raw = fs::read_to_string(&path).map_err(|_| DepTreeError::NoProject(dir.to_path_buf()))?;
        serde_json::from_str(&raw).map_err(|err| DepTreeError::corrupt("package.json", err))
    }

    fn root_id(&self, dir: &Path) -> String {
        let name = self.name.clone().unwrap_or_else(|| {
            dir.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "root".to_string())
        });
        npm_id(&name, self.version.as_deref())
    }

    /// Direct dependency names with the tag they were declared under.
    fn direct(&self) -> Vec<(&str, Option<&'static str>)> {
        let mut direct: Vec<(&str, Option<&'static str>)> = Vec::new();
        direct.extend(self.dependencies.keys().map(|name| (name.as_str(), None)));
        direct.extend(
            self.dev_dependencies
                .keys()
                .map(|name| (name.as_str(), Some("dev"))),
        );
        direct.extend(
            self.optional_dependencies
                .keys()
                .map(|name| (name.as_str(), Some("optional"))),
        );
        direct
    }
}

/// Splits `name@version`, keeping a leading `@scope/`.
fn split_name_version(raw: &str) -> Option<(&str, &str)> {
    let at = raw.get(1..)?.rfind('@')? + 1;
    let (name, version) = (&raw[..at], &raw[at + 1..]);
    (!name.is_empty() && !version.is_empty()).then_some((name, version))
}

/// `name@npm:1.0.0` → (`name`, `1.0.0`). Non-npm protocols are kept
/// verbatim as the version.
fn split_locator(locator: &str) -> Option<(&str, &str)> {
    let (name, reference) = split_name_version(locator)?;
    Some((name, reference.strip_prefix("npm:").unwrap_or(reference)))
}

#[derive(Debug, Deserialize)]
struct ClassicTree {
    name: String,
    #[serde(default)]
    children: Vec<ClassicTree>,
}

fn add_classic(module: &mut ModuleGraph, parent: Option<&str>, tree: &ClassicTree) {
    let Some((name, version)) = split_name_version(&tree.name) else {
        return;
    };
    let id = npm_id(name, Some(version.trim_start_matches('^')));
    module.graph.add_node(&id);
    if let Some(parent) = parent {
        module.graph.add_dependency(parent, &id);
    }
    for child in &tree.children {
        add_classic(module, Some(&id), child);
    }
}

/// Parses `yarn list --json` (NDJSON, one `tree` event carries the data).
pub(crate) fn parse_classic(raw: &str, package: &PackageJsonRef<'_>) -> Result<ModuleGraph> {
    let mut module = ModuleGraph::new(package.root.clone());
    let mut found = false;
    for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let Ok(event) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        if event.get("type").and_then(Value::as_str) != Some("tree") {
            continue;
        }
        let trees: Vec<ClassicTree> = serde_json::from_value(
            event
                .pointer("/data/trees")
                .cloned()
                .unwrap_or(Value::Array(Vec::new())),
        )
        .map_err(|err| DepTreeError::corrupt("yarn list", err))?;
        for tree in &trees {
            add_classic(&mut module, None, tree);
        }
        found = true;
    }
    if !found {
        return Err(DepTreeError::corrupt("yarn list", "no tree event in output"));
    }
    link_direct(&mut module, package);
    Ok(module)
}

/// Hoisted top-level packages are not all direct dependencies; the root only
/// links what package.json declares.
fn link_direct(module: &mut ModuleGraph, package: &PackageJsonRef<'_>) {
    let mut by_name: HashMap<String, String> = HashMap::new();
    for id in module.graph.node_ids() {
        if id == module.root {
            continue;
        }
        if let Ok(parsed) = depwarden_graph::ComponentId::parse(id) {
            by_name.entry(parsed.name).or_insert_with(|| id.to_string());
        }
    }
    let root = module.root.clone();
    for (name, tag) in &package.direct {
        if let Some(id) = by_name.get(*name) {
            module.graph.add_dependency(&root, id);
            if let Some(tag) = tag {
                module.graph.add_types(id, [*tag]);
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct BerryEntry {
    value: String,
    #[serde(default)]
    children: BerryChildren,
}

#[derive(Debug, Default, Deserialize)]
struct BerryChildren {
    #[serde(default, rename = "Dependencies")]
    dependencies: Vec<BerryDependency>,
}

#[derive(Debug, Deserialize)]
struct BerryDependency {
    locator: String,
}

fn berry_id(locator: &str, package: &PackageJsonRef<'_>) -> Option<String> {
    if locator.contains("@workspace:.") && !locator.contains("@workspace:./") {
        return Some(package.root.clone());
    }
    let (name, version) = split_locator(locator)?;
    Some(npm_id(name, Some(version)))
}

/// Parses `yarn info --all --recursive --json` (NDJSON, one entry per
/// locator).
pub(crate) fn parse_berry(raw: &str, package: &PackageJsonRef<'_>) -> Result<ModuleGraph> {
    let mut module = ModuleGraph::new(package.root.clone());
    let mut entries = 0usize;
    for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let entry: BerryEntry =
            serde_json::from_str(line).map_err(|err| DepTreeError::corrupt("yarn info", err))?;
        entries += 1;
        let Some(id) = berry_id(&entry.value, package) else {
            continue;
        };
        module.graph.add_node(&id);
        for dependency in &entry.children.dependencies {
            if let Some(child) = berry_id(&dependency.locator, package) {
                module.graph.add_dependency(&id, &child);
            }
        }
    }
    if entries == 0 {
        return Err(DepTreeError::corrupt("yarn info", "empty output"));
    }
    for (name, tag) in &package.direct {
        if let Some(tag) = tag {
            let ids: Vec<String> = module
                .graph
                .children(&module.root)
                .into_iter()
                .filter(|id| {
                    depwarden_graph::ComponentId::parse(id)
                        .map(|parsed| parsed.name == *name)
                        .unwrap_or(false)
                })
                .map(str::to_string)
                .collect();
            for id in ids {
                module.graph.add_types(&id, [*tag]);
            }
        }
    }
    Ok(module)
}

/// The parts of package.json the parsers need.
pub(crate) struct PackageJsonRef<'a> {
    root: String,
    direct: Vec<(&'a str, Option<&'static str>)>,
}

impl<'a> PackageJsonRef<'a> {
    fn new(package: &'a PackageJson, dir: &Path) -> Self {
        Self {
            root: package.root_id(dir),
            direct: package.direct(),
        }
    }
}

pub(crate) async fn build(
    params: &DepTreeParams,
    runner: &dyn CommandRunner,
    run: &mut AdapterRun,
) -> Result<DependencyTrees> {
    let dir = &params.working_dir;
    let package = PackageJson::read(dir)?;
    let scratch = ScratchDir::new("yarn")?;
    run.advance(AdapterState::ScratchReady);

    let version = run_checked(runner, &CommandSpec::new("yarn", dir).arg("--version")).await?;
    let flavor = YarnFlavor::from_version(&version.stdout)?;
    log::debug!("yarn {} ({flavor:?})", version.stdout.trim());

    let mut base = CommandSpec::new("yarn", dir);
    let mut guards = Vec::new();
    if let Some(server) = &params.server {
        base = params
            .secrets()
            .into_iter()
            .fold(base, |spec, secret| spec.secret(secret));
        match flavor {
            YarnFlavor::Classic => {
                let userconfig = scratch.write_private(".npmrc", &npmrc(server))?;
                guards.push(ConfigBackup::move_aside(&dir.join(".npmrc"))?);
                guards.push(ConfigBackup::move_aside(&dir.join(".yarnrc"))?);
                base = base
                    .env("NPM_CONFIG_USERCONFIG", userconfig.display().to_string())
                    .env("YARN_REGISTRY", format!("{}/", server.api_url("npm")));
            }
            YarnFlavor::Berry => {
                guards.push(ConfigBackup::preserve(&dir.join(".yarnrc.yml"))?);
                base = base
                    .env("YARN_NPM_REGISTRY_SERVER", server.api_url("npm"))
                    .env("YARN_NPM_ALWAYS_AUTH", "true");
                if let Some((user, secret)) = server.login() {
                    base = if user.is_empty() {
                        base.env("YARN_NPM_AUTH_TOKEN", secret)
                    } else {
                        let ident = basic_auth(user, secret);
                        base.secret(ident.clone()).env("YARN_NPM_AUTH_IDENT", ident)
                    };
                }
            }
        }
        run.advance(AdapterState::SettingsWritten);
    }

    if !dir.join("yarn.lock").is_file() {
        log::info!("No yarn.lock in {}; running install", dir.display());
        let install = match flavor {
            YarnFlavor::Classic => {
                let mut install = base.clone().arg("install");
                if !dir.join("node_modules").is_dir() {
                    install = install.arg(format!(
                        "--modules-folder={}",
                        scratch.join("node_modules").display()
                    ));
                }
                install.args(["--ignore-scripts", "--silent", "--non-interactive"])
            }
            YarnFlavor::Berry => base.clone().args(["install", "--mode=update-lockfile"]),
        };
        run_checked(runner, &install).await?;
    }

    let listing = match flavor {
        YarnFlavor::Classic => base.args(["list", "--json", "--no-progress"]),
        YarnFlavor::Berry => base.args(["info", "--all", "--recursive", "--json"]),
    };
    let output = runner.run(&listing).await?;
    run.advance(AdapterState::ResolverRan);

    let package_ref = PackageJsonRef::new(&package, dir);
    let (modules, resolver_error) = accept_output(
        &listing,
        output,
        |output| {
            let module = match flavor {
                YarnFlavor::Classic => parse_classic(&output.stdout, &package_ref)?,
                YarnFlavor::Berry => parse_berry(&output.stdout, &package_ref)?,
            };
            Ok(vec![module])
        },
    )?;
    run.advance(AdapterState::Parsed);

    for guard in guards {
        guard.restore()?;
    }
    let modules = if params.exclude_test_deps {
        modules
            .into_iter()
            .map(|module| ModuleGraph {
                graph: module.graph.without_only_tagged("dev", &module.root),
                root: module.root,
            })
            .collect()
    } else {
        modules
    };
    trees_from_modules(Technology::Yarn, modules, false, resolver_error)
}
