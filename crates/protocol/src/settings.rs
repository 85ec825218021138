use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_SETTINGS_FILE: &str = "depwarden.toml";

const DEFAULT_THREADS: usize = 10;
const MAX_THREADS: usize = 100;

/// Tunables read from `depwarden.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub threads: usize,
    pub head_timeout_secs: u64,
    pub get_timeout_secs: u64,
    /// Re-sends of a request after a 5xx or network error.
    pub retries: u32,
    pub scan_poll_interval_ms: u64,
    pub scan_max_polls: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            head_timeout_secs: 10,
            get_timeout_secs: 60,
            retries: 3,
            scan_poll_interval_ms: 1_000,
            scan_max_polls: 600,
        }
    }
}

impl Settings {
    /// Loads an explicit settings file, or `depwarden.toml` in the current
    /// directory when present. Missing default file means defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let settings = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_SETTINGS_FILE);
                if default_path.is_file() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        Ok(settings.normalized())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Invalid settings {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str::<Settings>(raw)?.normalized())
    }

    fn normalized(mut self) -> Self {
        self.threads = self.threads.clamp(1, MAX_THREADS);
        self.scan_max_polls = self.scan_max_polls.max(1);
        self
    }

    pub fn head_timeout(&self) -> Duration {
        Duration::from_secs(self.head_timeout_secs)
    }

    pub fn get_timeout(&self) -> Duration {
        Duration::from_secs(self.get_timeout_secs)
    }

    pub fn scan_poll_interval(&self) -> Duration {
        Duration::from_millis(self.scan_poll_interval_ms)
    }
}

/// Parses a thread count flag/env value, clamped to `1..=100`.
pub fn parse_threads(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|raw| raw.trim().parse::<usize>().ok())
        .unwrap_or(default)
        .clamp(1, MAX_THREADS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_file_keeps_defaults() {
        let settings = Settings::parse("threads = 4\nretries = 5\n").expect("parse");
        assert_eq!(
            settings,
            Settings {
                threads: 4,
                retries: 5,
                ..Settings::default()
            }
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Settings::parse("thread = 4").is_err());
    }

    #[test]
    fn threads_are_clamped() {
        assert_eq!(Settings::parse("threads = 0").expect("parse").threads, 1);
        assert_eq!(parse_threads(Some("1000"), 10), 100);
        assert_eq!(parse_threads(Some("nope"), 10), 10);
        assert_eq!(parse_threads(None, 7), 7);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        assert!(Settings::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
