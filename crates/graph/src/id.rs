use crate::{GraphError, Result};
use std::fmt;

const SCHEME_SEPARATOR: &str = "://";

/// Parsed canonical id `<scheme>://<name>[:<version>]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId {
    pub scheme: String,
    pub name: String,
    pub version: Option<String>,
}

impl ComponentId {
    pub fn new(scheme: &str, name: &str, version: Option<&str>) -> Self {
        Self {
            scheme: scheme.trim_end_matches(SCHEME_SEPARATOR).to_string(),
            name: name.to_string(),
            version: version.map(str::to_string),
        }
    }

    /// The version is whatever follows the last `:`, so `gav://g:a:v` has the
    /// name `g:a`.
    pub fn parse(id: &str) -> Result<Self> {
        let (scheme, rest) = id
            .split_once(SCHEME_SEPARATOR)
            .ok_or_else(|| GraphError::InvalidId(id.to_string()))?;
        if scheme.is_empty() || rest.is_empty() {
            return Err(GraphError::InvalidId(id.to_string()));
        }
        let (name, version) = match rest.rsplit_once(':') {
            Some((name, version)) if !name.is_empty() && !version.is_empty() => {
                (name, Some(version))
            }
            Some(_) => return Err(GraphError::InvalidId(id.to_string())),
            None => (rest, None),
        };
        Ok(Self::new(scheme, name, version))
    }

    pub fn version_or_empty(&self) -> &str {
        self.version.as_deref().unwrap_or_default()
    }

    /// npm scope (`@scope`) when the name is scoped.
    pub fn scope(&self) -> Option<&str> {
        self.name
            .strip_prefix('@')
            .and_then(|_| self.name.split_once('/'))
            .map(|(scope, _)| scope)
    }

    /// Name without its npm scope.
    pub fn unscoped_name(&self) -> &str {
        match self.scope() {
            Some(scope) => &self.name[scope.len() + 1..],
            None => &self.name,
        }
    }

    /// `(group, artifact)` of a `gav` name.
    pub fn group_artifact(&self) -> Option<(&str, &str)> {
        self.name.split_once(':')
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SCHEME_SEPARATOR}{}", self.scheme, self.name)?;
        if let Some(version) = &self.version {
            write!(f, ":{version}")?;
        }
        Ok(())
    }
}
