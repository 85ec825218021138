use serde::{Deserialize, Serialize};

pub const URL_ENV: &str = "DEPWARDEN_URL";
pub const ARTIFACTORY_URL_ENV: &str = "DEPWARDEN_ARTIFACTORY_URL";
pub const XRAY_URL_ENV: &str = "DEPWARDEN_XRAY_URL";
pub const USER_ENV: &str = "DEPWARDEN_USER";
pub const PASSWORD_ENV: &str = "DEPWARDEN_PASSWORD";
pub const ACCESS_TOKEN_ENV: &str = "DEPWARDEN_ACCESS_TOKEN";

/// How requests authenticate against the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Anonymous,
    Basic { user: String, password: String },
    Bearer(String),
}

/// Addresses of the remote platform. `url` is the platform root; the
/// artifactory and xray urls default to well-known paths under it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDetails {
    pub url: Option<String>,
    pub artifactory_url: Option<String>,
    pub xray_url: Option<String>,
    pub user: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

impl ServerDetails {
    pub fn from_env() -> Self {
        Self {
            url: env_non_empty(URL_ENV),
            artifactory_url: env_non_empty(ARTIFACTORY_URL_ENV),
            xray_url: env_non_empty(XRAY_URL_ENV),
            user: env_non_empty(USER_ENV),
            password: env_non_empty(PASSWORD_ENV),
            access_token: env_non_empty(ACCESS_TOKEN_ENV),
        }
    }

    /// Fields set on `overrides` replace ours.
    pub fn merged(self, overrides: ServerDetails) -> Self {
        Self {
            url: overrides.url.or(self.url),
            artifactory_url: overrides.artifactory_url.or(self.artifactory_url),
            xray_url: overrides.xray_url.or(self.xray_url),
            user: overrides.user.or(self.user),
            password: overrides.password.or(self.password),
            access_token: overrides.access_token.or(self.access_token),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some() || self.artifactory_url.is_some()
    }

    pub fn platform_url(&self) -> Option<String> {
        self.url.as_deref().map(with_trailing_slash)
    }

    pub fn artifactory_url(&self) -> Option<String> {
        if let Some(url) = &self.artifactory_url {
            return Some(with_trailing_slash(url));
        }
        self.platform_url().map(|url| format!("{url}artifactory/"))
    }

    pub fn xray_url(&self) -> Option<String> {
        if let Some(url) = &self.xray_url {
            return Some(with_trailing_slash(url));
        }
        self.platform_url().map(|url| format!("{url}xray/"))
    }

    pub fn credentials(&self) -> Credentials {
        if let Some(token) = &self.access_token {
            return Credentials::Bearer(token.clone());
        }
        match (&self.user, &self.password) {
            (Some(user), Some(password)) => Credentials::Basic {
                user: user.clone(),
                password: password.clone(),
            },
            _ => Credentials::Anonymous,
        }
    }

    /// Username and secret to inject into resolver settings files. Token
    /// auth falls back to the configured user name (or empty).
    pub fn resolver_login(&self) -> Option<(String, String)> {
        match self.credentials() {
            Credentials::Anonymous => None,
            Credentials::Basic { user, password } => Some((user, password)),
            Credentials::Bearer(token) => Some((self.user.clone().unwrap_or_default(), token)),
        }
    }
}
