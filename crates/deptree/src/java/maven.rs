use super::deptree_file::read_output_file;
use super::wrapper_or;
use crate::params::{DepTreeParams, ResolutionServer};
use crate::plugins::{ensure_plugin, MAVEN_DEP_TREE};
use crate::result::{accept_output, trees_from_modules, DependencyTrees};
use crate::runner::{run_checked, CommandRunner, CommandSpec};
use crate::scratch::{ConfigBackup, ScratchDir};
use crate::state::{AdapterRun, AdapterState};
use crate::template::escape_xml;
use crate::Result;
use depwarden_protocol::Technology;

const INSTALL_FILE_GOAL: &str = "org.apache.maven.plugins:maven-install-plugin:2.5.2:install-file";
const OUTPUT_FILE: &str = "mavendeptree.out";
const SETTINGS_FILE: &str = "settings.xml";
const MIRROR_ID: &str = "depwarden";

fn settings_xml(server: &ResolutionServer) -> String {
    let servers = match server.login() {
        Some((user, secret)) => format!(
            r#"
  <servers>
    <server>
      <id>{MIRROR_ID}</id>
      <username>{}</username>
      <password>{}</password>
    </server>
  </servers>"#,
            escape_xml(user),
            escape_xml(secret)
        ),
        None => String::new(),
    };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<settings xmlns="http://maven.apache.org/SETTINGS/1.0.0">{servers}
  <mirrors>
    <mirror>
      <id>{MIRROR_ID}</id>
      <url>{}</url>
      <mirrorOf>*</mirrorOf>
    </mirror>
  </mirrors>
</settings>
"#,
        escape_xml(&server.repo_url())
    )
}

pub(crate) async fn build(
    params: &DepTreeParams,
    runner: &dyn CommandRunner,
    run: &mut AdapterRun,
) -> Result<DependencyTrees> {
    let scratch = ScratchDir::new("maven")?;
    run.advance(AdapterState::ScratchReady);

    let mut settings_args = Vec::new();
    let mut maven_config = None;
    if let Some(server) = &params.server {
        let settings = scratch.write_private(SETTINGS_FILE, &settings_xml(server))?;
        settings_args = vec!["-s".to_string(), settings.display().to_string()];
        // `.mvn/maven.config` may carry its own `-s`.
        maven_config = Some(ConfigBackup::move_aside(
            &params.working_dir.join(".mvn").join("maven.config"),
        )?);
        run.advance(AdapterState::SettingsWritten);
    }

    let program = wrapper_or(&params.working_dir, params.use_wrapper, "mvnw", "mvn");
    let base = || {
        params.secrets().into_iter().fold(
            CommandSpec::new(&program, &params.working_dir),
            |spec, secret| spec.secret(secret),
        )
    };

    if !params.maven_plugin_installed {
        let jar =
            ensure_plugin(MAVEN_DEP_TREE, &params.dependencies_dir, &params.releases_url).await?;
        let install = base()
            .arg(INSTALL_FILE_GOAL)
            .arg(format!("-Dfile={}", jar.display()))
            .arg("-q")
            .args(settings_args.iter().cloned());
        run_checked(runner, &install).await?;
        run.advance(AdapterState::PluginInstalled);
    }

    let output_file = scratch.join(OUTPUT_FILE);
    let tree = base()
        .arg(format!("{}:tree", MAVEN_DEP_TREE.coordinates()))
        .arg(format!("-DdepsTreeOutputFile={}", output_file.display()))
        .arg("-q")
        .args(settings_args);
    let output = runner.run(&tree).await?;
    run.advance(AdapterState::ResolverRan);

    let (modules, resolver_error) = accept_output(
        &tree,
        output,
        |_| read_output_file(&output_file),
    )?;
    run.advance(AdapterState::Parsed);

    if let Some(backup) = maven_config {
        backup.restore()?;
    }
    trees_from_modules(
        Technology::Maven,
        modules,
        params.exclude_test_deps,
        resolver_error,
    )
}
