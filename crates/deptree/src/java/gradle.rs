use super::deptree_file::read_output_file;
use super::wrapper_or;
use crate::params::{DepTreeParams, ResolutionServer};
use crate::plugins::{ensure_plugin, GRADLE_DEP_TREE};
use crate::result::{accept_output, trees_from_modules, DependencyTrees};
use crate::runner::{CommandRunner, CommandSpec};
use crate::scratch::ScratchDir;
use crate::state::{AdapterRun, AdapterState};
use crate::template::escape_groovy;
use crate::Result;
use depwarden_protocol::Technology;
use std::path::Path;

const INIT_FILE: &str = "gradledeptree.init";
const OUTPUT_FILE: &str = "gradledeptree.out";

fn repository_block(server: &ResolutionServer) -> String {
    let url = escape_groovy(&server.repo_url());
    match server.login() {
        Some((user, secret)) => format!(
            r#"
        maven {{
            url '{url}'
            credentials {{
                username = '{}'
                password = '{}'
            }}
        }}"#,
            escape_groovy(user),
            escape_groovy(secret)
        ),
        None => format!(
            r#"
        maven {{
            url '{url}'
        }}"#
        ),
    }
}

fn init_script(plugin_jar: &Path, server: Option<&ResolutionServer>) -> String {
    let repository = server.map(repository_block).unwrap_or_default();
    let jar = escape_groovy(&plugin_jar.display().to_string());
    format!(
        r#"initscript {{
    repositories {{{repository}
        mavenCentral()
    }}
    dependencies {{
        classpath files('{jar}')
    }}
}}

allprojects {{
    repositories {{{repository}
    }}
    apply plugin: com.jfrog.GradleDepTree
}}
"#
    )
}

pub(crate) async fn build(
    params: &DepTreeParams,
    runner: &dyn CommandRunner,
    run: &mut AdapterRun,
) -> Result<DependencyTrees> {
    let scratch = ScratchDir::new("gradle")?;
    run.advance(AdapterState::ScratchReady);

    let jar = ensure_plugin(GRADLE_DEP_TREE, &params.dependencies_dir, &params.releases_url).await?;
    let init = scratch.write_private(INIT_FILE, &init_script(&jar, params.server.as_ref()))?;
    if params.server.is_some() {
        run.advance(AdapterState::SettingsWritten);
    }
    run.advance(AdapterState::PluginInstalled);

    let program = wrapper_or(&params.working_dir, params.use_wrapper, "gradlew", "gradle");
    let output_file = scratch.join(OUTPUT_FILE);
    let spec = params
        .secrets()
        .into_iter()
        .fold(
            CommandSpec::new(program, &params.working_dir),
            |spec, secret| spec.secret(secret),
        )
        .args(["clean", "generateDepTrees", "-I"])
        .arg(init.display().to_string())
        .arg("-q")
        .arg(format!(
            "-Dcom.jfrog.depsTreeOutputFile={}",
            output_file.display()
        ))
        .arg("-Dcom.jfrog.includeAllBuildFiles=true");
    let output = runner.run(&spec).await?;
    run.advance(AdapterState::ResolverRan);

    let (modules, resolver_error) = accept_output(
        &spec,
        output,
        |_| read_output_file(&output_file),
    )?;
    run.advance(AdapterState::Parsed);
    trees_from_modules(
        Technology::Gradle,
        modules,
        params.exclude_test_deps,
        resolver_error,
    )
}
