use depwarden_protocol::ServerDetails;
use std::path::{Path, PathBuf};
use url::Url;

/// Where the resolver plugins are downloaded from unless overridden.
pub const DEFAULT_RELEASES_URL: &str = "https://releases.jfrog.io/artifactory/oss-release-local";

/// A remote repository the resolvers are pointed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionServer {
    artifactory_url: String,
    repo: String,
    login: Option<(String, String)>,
}

impl ResolutionServer {
    pub fn new(artifactory_url: &str, repo: &str, login: Option<(String, String)>) -> Self {
        let mut artifactory_url = artifactory_url.trim_end_matches('/').to_string();
        artifactory_url.push('/');
        Self {
            artifactory_url,
            repo: repo.trim_matches('/').to_string(),
            login,
        }
    }

    /// `None` when no server is configured or no repository was chosen.
    pub fn from_details(details: &ServerDetails, repo: Option<&str>) -> Option<Self> {
        let repo = repo.map(str::trim).filter(|repo| !repo.is_empty())?;
        let url = details.artifactory_url()?;
        Some(Self::new(&url, repo, details.resolver_login()))
    }

    /// Artifactory url with a trailing slash.
    pub fn artifactory_url(&self) -> &str {
        &self.artifactory_url
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn login(&self) -> Option<(&str, &str)> {
        self.login
            .as_ref()
            .map(|(user, secret)| (user.as_str(), secret.as_str()))
    }

    /// `<artifactory>/<repo>`, the layout Maven and Gradle resolve against.
    pub fn repo_url(&self) -> String {
        format!("{}{}", self.artifactory_url, self.repo)
    }

    /// `<artifactory>/api/<api>/<repo>`.
    pub fn api_url(&self, api: &str) -> String {
        format!("{}api/{api}/{}", self.artifactory_url, self.repo)
    }

    /// `url` with the login embedded as userinfo, for tools configured
    /// through a single url. Unparseable urls come back unchanged.
    pub fn with_userinfo(&self, url: &str) -> String {
        let Some((user, secret)) = self.login() else {
            return url.to_string();
        };
        match embed_login(url, user, secret) {
            Some(with_login) => with_login.to_string(),
            None => url.to_string(),
        }
    }

    /// Values that must never reach a log line.
    pub fn secrets(&self) -> Vec<String> {
        match self.login() {
            Some((user, secret)) if !secret.is_empty() => {
                let mut secrets = vec![secret.to_string()];
                if let Some(encoded) = embed_login(&self.artifactory_url, user, secret)
                    .as_ref()
                    .and_then(Url::password)
                {
                    if encoded != secret {
                        secrets.push(encoded.to_string());
                    }
                }
                secrets
            }
            _ => Vec::new(),
        }
    }
}

fn embed_login(url: &str, user: &str, secret: &str) -> Option<Url> {
    let mut url = Url::parse(url).ok()?;
    url.set_username(user).ok()?;
    url.set_password(Some(secret)).ok()?;
    Some(url)
}

/// Inputs shared by every adapter.
#[derive(Debug, Clone)]
pub struct DepTreeParams {
    pub working_dir: PathBuf,
    pub server: Option<ResolutionServer>,
    /// Prefer `mvnw` / `gradlew` when the project ships one.
    pub use_wrapper: bool,
    pub exclude_test_deps: bool,
    /// Skip `install-file` for the Maven plugin.
    pub maven_plugin_installed: bool,
    pub dependencies_dir: PathBuf,
    pub releases_url: String,
}

impl DepTreeParams {
    pub fn new(working_dir: impl AsRef<Path>, dependencies_dir: impl AsRef<Path>) -> Self {
        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            server: None,
            use_wrapper: false,
            exclude_test_deps: false,
            maven_plugin_installed: false,
            dependencies_dir: dependencies_dir.as_ref().to_path_buf(),
            releases_url: DEFAULT_RELEASES_URL.to_string(),
        }
    }

    pub fn with_server(mut self, server: Option<ResolutionServer>) -> Self {
        self.server = server;
        self
    }

    pub fn with_working_dir(&self, working_dir: &Path) -> Self {
        Self {
            working_dir: working_dir.to_path_buf(),
            ..self.clone()
        }
    }

    pub(crate) fn secrets(&self) -> Vec<String> {
        self.server
            .as_ref()
            .map(ResolutionServer::secrets)
            .unwrap_or_default()
    }
}
