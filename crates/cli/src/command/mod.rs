pub mod audit;
pub mod curation;
pub mod detect;
pub mod summary;

use anyhow::{Context, Result};
use depwarden_deptree::{DepTreeParams, ResolutionServer};
use depwarden_http::{HttpClient, HttpConfig};
use depwarden_protocol::{dependencies_dir, ServerDetails, Settings, RELEASES_URL_ENV};
use depwarden_summary::MarkdownConfig;
use std::path::{Path, PathBuf};

pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    let settings = Settings::load(explicit)?;
    log::debug!("Settings: {settings:?}");
    Ok(settings)
}

/// Requested directories made absolute, or the current directory.
pub fn working_dirs(requested: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let cwd = std::env::current_dir().context("Cannot read the current directory")?;
    if requested.is_empty() {
        return Ok(vec![cwd]);
    }
    Ok(requested
        .iter()
        .map(|dir| if dir.is_absolute() { dir.clone() } else { cwd.join(dir) })
        .collect())
}

pub fn http_client(server: &ServerDetails, settings: &Settings) -> Result<HttpClient> {
    Ok(HttpClient::new(
        server.credentials(),
        HttpConfig::from_settings(settings),
    )?)
}

pub fn tree_params(
    server: &ServerDetails,
    repo: Option<&str>,
    use_wrapper: bool,
    exclude_test_deps: bool,
) -> Result<DepTreeParams> {
    let cwd = std::env::current_dir().context("Cannot read the current directory")?;
    let mut params = DepTreeParams::new(cwd, dependencies_dir()?)
        .with_server(ResolutionServer::from_details(server, repo));
    params.use_wrapper = use_wrapper;
    params.exclude_test_deps = exclude_test_deps;
    if let Some(url) = std::env::var(RELEASES_URL_ENV)
        .ok()
        .filter(|url| !url.trim().is_empty())
    {
        params.releases_url = url.trim().trim_end_matches('/').to_string();
    }
    Ok(params)
}

/// Resolved once per process. Extended mode needs a reachable platform, and
/// nothing is probed while the summary store is disabled.
pub async fn markdown_config(
    server: &ServerDetails,
    settings: &Settings,
) -> Result<MarkdownConfig> {
    if depwarden_protocol::summary_output_dir().is_none() {
        return Ok(MarkdownConfig::basic());
    }
    let Some(platform_url) = server.platform_url() else {
        return Ok(MarkdownConfig::basic());
    };
    let project = depwarden_protocol::Provenance::from_env().project;
    let http = http_client(server, settings)?;
    Ok(MarkdownConfig::probe(&http, &platform_url, project).await)
}
