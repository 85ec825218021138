use crate::scratch::is_skipped_dir;
use crate::{DepTreeError, Result};
use depwarden_protocol::Technology;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Technology → directories it was detected in, shallowest first.
pub type DetectedTechnologies = BTreeMap<Technology, Vec<PathBuf>>;

/// Technologies whose root build already covers nested modules.
fn covers_descendants(tech: Technology) -> bool {
    matches!(
        tech,
        Technology::Maven | Technology::Gradle | Technology::Nuget
    )
}

/// Technologies detected from the entries directly inside `dir`.
pub fn detect_in_dir(dir: &Path) -> Result<Vec<Technology>> {
    let entries: Vec<String> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    Ok(Technology::ALL
        .into_iter()
        .filter(|tech| tech.signature().matches(&entries))
        .collect())
}

/// Walks `root` (one directory unless `recursive`) and groups matching
/// directories per technology.
pub fn detect_technologies(root: &Path, recursive: bool) -> Result<DetectedTechnologies> {
    if !root.is_dir() {
        return Err(DepTreeError::NoProject(root.to_path_buf()));
    }
    let mut detected = DetectedTechnologies::new();
    let max_depth = if recursive { usize::MAX } else { 0 };
    let walker = WalkDir::new(root)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_skipped_dir(entry));

    for entry in walker {
        let entry = entry.map_err(|err| DepTreeError::Other(err.to_string()))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let dir = entry.path();
        for tech in detect_in_dir(dir)? {
            let dirs = detected.entry(tech).or_default();
            let covered =
                covers_descendants(tech) && dirs.iter().any(|parent| dir.starts_with(parent));
            if !covered {
                dirs.push(dir.to_path_buf());
            }
        }
    }
    for (tech, dirs) in &detected {
        log::debug!("Detected {tech} in {} location(s)", dirs.len());
    }
    Ok(detected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "").unwrap();
    }

    #[test]
    fn yarn_lock_wins_over_npm() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "package.json");
        touch(dir.path(), "yarn.lock");
        assert_eq!(detect_in_dir(dir.path()).unwrap(), vec![Technology::Yarn]);
    }

    #[test]
    fn poetry_needs_lock_file() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "pyproject.toml");
        assert!(detect_in_dir(dir.path()).unwrap().is_empty());
        touch(dir.path(), "poetry.lock");
        assert_eq!(detect_in_dir(dir.path()).unwrap(), vec![Technology::Poetry]);
    }

    #[test]
    fn non_recursive_looks_at_root_only() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "go.mod");
        touch(dir.path(), "web/package.json");
        let detected = detect_technologies(dir.path(), false).unwrap();
        assert_eq!(detected.keys().copied().collect::<Vec<_>>(), vec![Technology::Go]);
    }

    #[test]
    fn recursive_walk_skips_node_modules_and_submodules() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "pom.xml");
        touch(dir.path(), "core/pom.xml");
        touch(dir.path(), "web/package.json");
        touch(dir.path(), "web/node_modules/left-pad/package.json");
        touch(dir.path(), "docker/Dockerfile");

        let detected = detect_technologies(dir.path(), true).unwrap();
        assert_eq!(detected[&Technology::Maven], vec![dir.path().to_path_buf()]);
        assert_eq!(detected[&Technology::Npm], vec![dir.path().join("web")]);
        assert_eq!(
            detected[&Technology::Docker],
            vec![dir.path().join("docker")]
        );
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = detect_technologies(&dir.path().join("nope"), true).unwrap_err();
        assert!(matches!(err, DepTreeError::NoProject(_)));
    }
}
