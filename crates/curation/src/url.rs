use crate::{CurationError, Result};
use depwarden_graph::ComponentId;
use depwarden_protocol::Technology;

/// A graph node translated into what the repository serves for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
    /// Display name, npm scope included (`@scope/pkg`).
    pub name: String,
    pub version: String,
    pub url: String,
}

/// Builds download urls for one technology against one repository.
#[derive(Debug, Clone)]
pub struct Locator {
    technology: Technology,
    artifactory_url: String,
    repo: String,
}

impl Locator {
    pub fn new(technology: Technology, artifactory_url: &str, repo: &str) -> Self {
        Self {
            technology,
            artifactory_url: artifactory_url.trim_end_matches('/').to_string(),
            repo: repo.trim_matches('/').to_string(),
        }
    }

    pub fn technology(&self) -> Technology {
        self.technology
    }

    pub fn locate(&self, id: &str) -> Result<PackageRef> {
        let parsed = ComponentId::parse(id).map_err(|_| CurationError::InvalidId(id.to_string()))?;
        let version = parsed.version_or_empty().to_string();
        let (rt, repo) = (&self.artifactory_url, &self.repo);
        let url = match self.technology {
            Technology::Npm | Technology::Yarn => {
                let file = parsed.unscoped_name();
                format!("{rt}/api/npm/{repo}/{}/-/{file}-{version}.tgz", parsed.name)
            }
            Technology::Maven | Technology::Gradle => {
                let (group, artifact) = parsed
                    .group_artifact()
                    .ok_or_else(|| CurationError::InvalidId(id.to_string()))?;
                format!(
                    "{rt}/{repo}/{}/{artifact}/{version}/{artifact}-{version}.jar",
                    group.replace('.', "/")
                )
            }
            Technology::Go => format!("{rt}/api/go/{repo}/{}/@v/{version}.zip", parsed.name),
            Technology::Pip | Technology::Pipenv | Technology::Poetry => format!(
                "{rt}/api/pypi/{repo}/packages/{name}/{version}/{name}-{version}.tar.gz",
                name = parsed.name
            ),
            Technology::Nuget => {
                format!("{rt}/api/nuget/{repo}/Download/{}/{version}", parsed.name)
            }
            Technology::Docker => return Err(CurationError::Unsupported(Technology::Docker)),
        };
        Ok(PackageRef {
            name: parsed.name,
            version,
            url,
        })
    }
}
