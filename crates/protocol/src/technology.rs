use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Filesystem signature of a technology inside a single directory.
///
/// Indicators and excludes match as filename suffixes, `requires` must be
/// present verbatim.
#[derive(Debug, Clone, Copy)]
pub struct DetectionSignature {
    pub indicators: &'static [&'static str],
    pub excludes: &'static [&'static str],
    pub requires: &'static [&'static str],
}

impl DetectionSignature {
    pub fn matches<S: AsRef<str>>(&self, entries: &[S]) -> bool {
        let hit = |patterns: &[&str]| {
            entries
                .iter()
                .any(|entry| patterns.iter().any(|p| entry.as_ref().ends_with(p)))
        };
        if !hit(self.indicators) || hit(self.excludes) {
            return false;
        }
        self.requires
            .iter()
            .all(|required| entries.iter().any(|entry| entry.as_ref() == *required))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Technology {
    Maven,
    Gradle,
    Npm,
    Yarn,
    Go,
    Pip,
    Pipenv,
    Poetry,
    Nuget,
    Docker,
}

impl Technology {
    pub const ALL: [Technology; 10] = [
        Technology::Maven,
        Technology::Gradle,
        Technology::Npm,
        Technology::Yarn,
        Technology::Go,
        Technology::Pip,
        Technology::Pipenv,
        Technology::Poetry,
        Technology::Nuget,
        Technology::Docker,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Technology::Maven => "maven",
            Technology::Gradle => "gradle",
            Technology::Npm => "npm",
            Technology::Yarn => "yarn",
            Technology::Go => "go",
            Technology::Pip => "pip",
            Technology::Pipenv => "pipenv",
            Technology::Poetry => "poetry",
            Technology::Nuget => "nuget",
            Technology::Docker => "docker",
        }
    }

    pub fn formal_name(self) -> &'static str {
        match self {
            Technology::Maven => "Maven",
            Technology::Gradle => "Gradle",
            Technology::Npm => "npm",
            Technology::Yarn => "Yarn",
            Technology::Go => "Go",
            Technology::Pip => "pip",
            Technology::Pipenv => "Pipenv",
            Technology::Poetry => "Poetry",
            Technology::Nuget => "NuGet",
            Technology::Docker => "Docker",
        }
    }

    /// Canonical id prefix of graph nodes produced for this technology.
    pub fn id_scheme(self) -> Option<&'static str> {
        match self {
            Technology::Maven | Technology::Gradle => Some("gav://"),
            Technology::Npm | Technology::Yarn => Some("npm://"),
            Technology::Go => Some("go://"),
            Technology::Pip | Technology::Pipenv | Technology::Poetry => Some("pypi://"),
            Technology::Nuget => Some("nuget://"),
            Technology::Docker => None,
        }
    }

    /// Package type tag written on status records.
    pub fn package_type(self) -> &'static str {
        match self {
            Technology::Maven | Technology::Gradle => "maven",
            Technology::Npm | Technology::Yarn => "npm",
            Technology::Go => "go",
            Technology::Pip | Technology::Pipenv | Technology::Poetry => "pypi",
            Technology::Nuget => "nuget",
            Technology::Docker => "docker",
        }
    }

    pub fn signature(self) -> DetectionSignature {
        let (indicators, excludes, requires): (&[&str], &[&str], &[&str]) = match self {
            Technology::Maven => (&["pom.xml"], &[], &[]),
            Technology::Gradle => (&[".gradle", ".gradle.kts"], &[], &[]),
            Technology::Npm => (&["package.json"], &[".yarnrc.yml", "yarn.lock", ".yarn"], &[]),
            Technology::Yarn => (&[".yarnrc.yml", "yarn.lock", ".yarn"], &[], &[]),
            Technology::Go => (&["go.mod"], &[], &[]),
            Technology::Pip => (
                &["setup.py", "requirements.txt"],
                &["Pipfile", "Pipfile.lock", "pyproject.toml", "poetry.lock"],
                &[],
            ),
            Technology::Pipenv => (&["Pipfile", "Pipfile.lock"], &[], &[]),
            Technology::Poetry => (&["pyproject.toml"], &[], &["pyproject.toml", "poetry.lock"]),
            Technology::Nuget => (&[".sln", ".csproj"], &[], &[]),
            Technology::Docker => (&["Dockerfile"], &[], &[]),
        };
        DetectionSignature {
            indicators,
            excludes,
            requires,
        }
    }

    /// Whether a dependency tree can be built for this technology.
    pub fn has_resolver(self) -> bool {
        self.id_scheme().is_some()
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Technology {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Technology::ALL
            .into_iter()
            .find(|tech| tech.as_str() == lowered)
            .ok_or_else(|| format!("unknown technology '{s}'"))
    }
}
