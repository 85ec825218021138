use crate::params::{DepTreeParams, ResolutionServer};
use crate::result::{accept_output, trees_from_modules, DependencyTrees, ModuleGraph};
use crate::runner::{run_checked, CommandRunner, CommandSpec};
use crate::scratch::{ConfigBackup, ScratchDir};
use crate::state::{AdapterRun, AdapterState};
use crate::template::basic_auth;
use crate::{DepTreeError, Result};
use depwarden_protocol::Technology;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

pub(crate) const NPM_SCHEME: &str = "npm://";
const NPMRC: &str = ".npmrc";
const LOCK_FILES: &[&str] = &["package-lock.json", "npm-shrinkwrap.json"];

/// One entry of `npm ls --json --long` output.
#[derive(Debug, Default, Deserialize)]
struct NpmPackage {
    name: Option<String>,
    version: Option<String>,
    #[serde(default)]
    dev: bool,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    peer: bool,
    #[serde(default)]
    dependencies: BTreeMap<String, NpmPackage>,
}

impl NpmPackage {
    fn types(&self) -> Vec<&'static str> {
        let mut types = Vec::new();
        if self.dev {
            types.push("dev");
        }
        if self.optional {
            types.push("optional");
        }
        if self.peer {
            types.push("peer");
        }
        types
    }
}

pub(crate) fn npm_id(name: &str, version: Option<&str>) -> String {
    match version.filter(|version| !version.is_empty()) {
        Some(version) => format!("{NPM_SCHEME}{name}:{version}"),
        None => format!("{NPM_SCHEME}{name}"),
    }
}

/// `.npmrc` pointing the registry at the remote repository.
pub(crate) fn npmrc(server: &ResolutionServer) -> String {
    let registry = format!("{}/", server.api_url("npm"));
    let mut contents = format!("registry={registry}\n");
    if let Some((user, secret)) = server.login() {
        let scope = registry
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&registry);
        if user.is_empty() {
            contents.push_str(&format!("//{scope}:_authToken={secret}\n"));
        } else {
            contents.push_str(&format!("//{scope}:_auth={}\n", basic_auth(user, secret)));
        }
        contents.push_str("always-auth=true\n");
    }
    contents
}

fn add_package(module: &mut ModuleGraph, parent: &str, name: &str, package: &NpmPackage) {
    // Missing or unresolved entries carry no version.
    let Some(version) = package.version.as_deref() else {
        return;
    };
    let id = npm_id(name, Some(version));
    module.graph.add_dependency(parent, &id);
    module.graph.add_types(&id, package.types());
    for (child_name, child) in &package.dependencies {
        add_package(module, &id, child_name, child);
    }
}

/// Parses `npm ls --json` output. The project itself becomes the root.
pub(crate) fn parse_npm_ls(raw: &str, project_dir: &Path) -> Result<ModuleGraph> {
    if raw.trim().is_empty() {
        return Err(DepTreeError::corrupt("npm ls", "empty output"));
    }
    let project: NpmPackage =
        serde_json::from_str(raw).map_err(|err| DepTreeError::corrupt("npm ls", err))?;
    let name = project.name.clone().unwrap_or_else(|| {
        project_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "root".to_string())
    });
    let mut module = ModuleGraph::new(npm_id(&name, project.version.as_deref()));
    let root = module.root.clone();
    for (child_name, child) in &project.dependencies {
        add_package(&mut module, &root, child_name, child);
    }
    Ok(module)
}

pub(crate) async fn build(
    params: &DepTreeParams,
    runner: &dyn CommandRunner,
    run: &mut AdapterRun,
) -> Result<DependencyTrees> {
    let dir = &params.working_dir;
    if !dir.join("package.json").is_file() {
        return Err(DepTreeError::NoProject(dir.clone()));
    }
    let scratch = ScratchDir::new("npm")?;
    run.advance(AdapterState::ScratchReady);

    let mut config_args = Vec::new();
    let mut project_npmrc = None;
    let mut base = CommandSpec::new("npm", dir);
    if let Some(server) = &params.server {
        let contents = npmrc(server);
        let userconfig = scratch.write_private(NPMRC, &contents)?;
        config_args = vec!["--userconfig".to_string(), userconfig.display().to_string()];
        project_npmrc = Some(ConfigBackup::move_aside(&dir.join(NPMRC))?);
        if let Some((user, secret)) = server.login() {
            base = base.secret(basic_auth(user, secret));
        }
        base = params
            .secrets()
            .into_iter()
            .fold(base, |spec, secret| spec.secret(secret));
        run.advance(AdapterState::SettingsWritten);
    }

    if !LOCK_FILES.iter().any(|name| dir.join(name).is_file()) {
        log::info!("No package-lock.json in {}; generating one", dir.display());
        let install = base
            .clone()
            .args(["install", "--package-lock-only", "--ignore-scripts"])
            .args(config_args.iter().cloned());
        run_checked(runner, &install).await?;
    }

    let mut ls = base.args(["ls", "--json", "--all", "--long"]);
    if !dir.join("node_modules").is_dir() {
        ls = ls.arg("--package-lock-only");
    }
    if params.exclude_test_deps {
        ls = ls.arg("--omit=dev");
    }
    let ls = ls.args(config_args);
    let output = runner.run(&ls).await?;
    run.advance(AdapterState::ResolverRan);

    let (modules, resolver_error) = accept_output(
        &ls,
        output,
        |output| parse_npm_ls(&output.stdout, dir).map(|module| vec![module]),
    )?;
    run.advance(AdapterState::Parsed);

    if let Some(backup) = project_npmrc {
        backup.restore()?;
    }
    trees_from_modules(Technology::Npm, modules, false, resolver_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CommandOutput;
    use crate::testing::{arg_after, FakeRunner};
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    const NPM_LS: &str = r#"{
        "name": "app",
        "version": "1.0.0",
        "dependencies": {
            "@scope/pkg": {
                "version": "1.2.3",
                "dependencies": {
                    "left-pad": {"version": "1.3.0"}
                }
            },
            "jest": {"version": "29.0.0", "dev": true},
            "left-pad": {"version": "1.3.0"},
            "ghost": {"required": "^2.0.0", "missing": true}
        }
    }"#;

    #[test]
    fn parses_nested_dependencies_with_tags() {
        let module = parse_npm_ls(NPM_LS, Path::new("/work/app")).unwrap();
        assert_eq!(module.root, "npm://app:1.0.0");
        assert_eq!(
            module.graph.children("npm://app:1.0.0"),
            vec!["npm://@scope/pkg:1.2.3", "npm://jest:29.0.0", "npm://left-pad:1.3.0"]
        );
        assert_eq!(
            module.graph.children("npm://@scope/pkg:1.2.3"),
            vec!["npm://left-pad:1.3.0"]
        );
        assert!(module.graph.types("npm://jest:29.0.0").unwrap().contains("dev"));
        assert!(!module.graph.contains("npm://ghost"));
    }

    #[test]
    fn nameless_project_uses_directory_name() {
        let module = parse_npm_ls(r#"{"dependencies": {}}"#, Path::new("/work/web")).unwrap();
        assert_eq!(module.root, "npm://web");
    }

    #[test]
    fn garbage_is_corrupt() {
        let err = parse_npm_ls("npm ERR! code ELSPROBLEMS", Path::new("/x")).unwrap_err();
        assert!(matches!(err, DepTreeError::ParseCorrupt { .. }));
    }

    #[test]
    fn npmrc_uses_token_or_basic_auth() {
        let token = ResolutionServer::new(
            "https://acme.example/artifactory",
            "npm-remote",
            Some((String::new(), "tok".into())),
        );
        assert_eq!(
            npmrc(&token),
            "registry=https://acme.example/artifactory/api/npm/npm-remote/\n\
             //acme.example/artifactory/api/npm/npm-remote/:_authToken=tok\n\
             always-auth=true\n"
        );
        let basic = ResolutionServer::new(
            "https://acme.example/artifactory",
            "npm-remote",
            Some(("user".into(), "pass".into())),
        );
        assert!(npmrc(&basic).contains(":_auth=dXNlcjpwYXNz\n"));
    }

    #[tokio::test]
    async fn missing_lock_file_triggers_install_without_scripts() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("package.json"), "{}").unwrap();
        let runner = FakeRunner::new(|spec| {
            if spec.args[0] == "ls" {
                CommandOutput::success(NPM_LS)
            } else {
                CommandOutput::success("")
            }
        });
        let params = DepTreeParams::new(project.path(), project.path());
        let mut run = AdapterRun::start(Technology::Npm);
        let trees = build(&params, &runner, &mut run).await.unwrap();

        let calls = runner.calls();
        assert_eq!(
            calls[0].args,
            vec!["install", "--package-lock-only", "--ignore-scripts"]
        );
        assert!(calls[1].args.contains(&"--package-lock-only".to_string()));
        assert_eq!(trees.unique.len(), 4);
        assert!(trees.resolver_error.is_none());
    }

    #[tokio::test]
    async fn project_npmrc_is_moved_aside_during_resolution() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("package.json"), "{}").unwrap();
        fs::write(project.path().join("package-lock.json"), "{}").unwrap();
        fs::write(project.path().join(NPMRC), "registry=https://private.example/\n").unwrap();

        let seen = Arc::new(Mutex::new((false, String::new())));
        let observed = seen.clone();
        let npmrc_path = project.path().join(NPMRC);
        let runner = FakeRunner::new(move |spec| {
            let userconfig = arg_after(spec, "--userconfig").expect("userconfig");
            *observed.lock().unwrap() =
                (npmrc_path.exists(), fs::read_to_string(userconfig).unwrap());
            // npm ls exits 1 on unmet peers but still prints the tree.
            CommandOutput {
                status: Some(1),
                stdout: NPM_LS.to_string(),
                stderr: "npm ERR! invalid: peer dep".to_string(),
            }
        });
        let params = DepTreeParams::new(project.path(), project.path()).with_server(Some(
            ResolutionServer::new(
                "https://acme.example/artifactory",
                "npm-remote",
                Some(("user".into(), "pass".into())),
            ),
        ));
        let mut run = AdapterRun::start(Technology::Npm);
        let trees = build(&params, &runner, &mut run).await.unwrap();

        let (project_npmrc_present, userconfig) = seen.lock().unwrap().clone();
        assert!(!project_npmrc_present);
        assert!(userconfig.starts_with(
            "registry=https://acme.example/artifactory/api/npm/npm-remote/"
        ));
        assert_eq!(
            fs::read_to_string(project.path().join(NPMRC)).unwrap(),
            "registry=https://private.example/\n"
        );
        assert_eq!(
            trees.resolver_error.as_deref(),
            Some("npm failed with exit code 1")
        );
    }
}
