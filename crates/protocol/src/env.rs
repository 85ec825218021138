use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const HOME_DIR_ENV: &str = "DEPWARDEN_HOME_DIR";
pub const SUMMARY_OUTPUT_DIR_ENV: &str = "DEPWARDEN_SUMMARY_OUTPUT_DIR";
pub const DEPENDENCIES_DIR_ENV: &str = "DEPWARDEN_DEPENDENCIES_DIR";
pub const BUILD_NAME_ENV: &str = "DEPWARDEN_BUILD_NAME";
pub const BUILD_NUMBER_ENV: &str = "DEPWARDEN_BUILD_NUMBER";
pub const PROJECT_ENV: &str = "DEPWARDEN_PROJECT";
pub const RELEASES_URL_ENV: &str = "DEPWARDEN_RELEASES_URL";

const HOME_DIR_NAME: &str = ".depwarden";

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Resolves the home directory from an explicit override, falling back to
/// `~/.depwarden`.
pub fn resolve_home_dir(raw: Option<&str>) -> Result<PathBuf> {
    if let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        return Ok(PathBuf::from(raw));
    }
    let home = dirs::home_dir().context("Cannot determine the user home directory")?;
    Ok(home.join(HOME_DIR_NAME))
}

pub fn home_dir() -> Result<PathBuf> {
    resolve_home_dir(env_non_empty(HOME_DIR_ENV).as_deref())
}

/// Cache directory for downloaded resolver plugins.
pub fn dependencies_dir() -> Result<PathBuf> {
    match env_non_empty(DEPENDENCIES_DIR_ENV) {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => Ok(home_dir()?.join("dependencies")),
    }
}

/// `None` disables the command summary store.
pub fn summary_output_dir() -> Option<PathBuf> {
    env_non_empty(SUMMARY_OUTPUT_DIR_ENV).map(PathBuf::from)
}

/// Build provenance attached to status records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

impl Provenance {
    pub fn from_env() -> Self {
        Self {
            build_name: env_non_empty(BUILD_NAME_ENV),
            build_number: env_non_empty(BUILD_NUMBER_ENV),
            project: env_non_empty(PROJECT_ENV),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.build_name.is_none() && self.build_number.is_none() && self.project.is_none()
    }

    /// Build name and number, when both are known.
    pub fn build(&self) -> Option<(&str, &str)> {
        Some((self.build_name.as_deref()?, self.build_number.as_deref()?))
    }
}
