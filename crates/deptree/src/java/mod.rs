mod deptree_file;
pub(crate) mod gradle;
pub(crate) mod maven;

use std::path::Path;

/// `<dir>/<wrapper>` when requested and present, otherwise `fallback` from
/// the PATH.
fn wrapper_or(dir: &Path, use_wrapper: bool, wrapper: &str, fallback: &str) -> String {
    if use_wrapper {
        let candidates = if cfg!(windows) {
            vec![
                dir.join(format!("{wrapper}.cmd")),
                dir.join(format!("{wrapper}.bat")),
            ]
        } else {
            vec![dir.join(wrapper)]
        };
        if let Some(found) = candidates.iter().find(|path| path.is_file()) {
            return found.display().to_string();
        }
        log::debug!("No {wrapper} in {}; using {fallback}", dir.display());
    }
    fallback.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    #[test]
    fn wrapper_is_used_only_when_present_and_requested() {
        let dir = TempDir::new().unwrap();
        assert_eq!(wrapper_or(dir.path(), true, "mvnw", "mvn"), "mvn");
        std::fs::write(dir.path().join("mvnw"), "#!/bin/sh\n").unwrap();
        assert_eq!(wrapper_or(dir.path(), false, "mvnw", "mvn"), "mvn");
        assert_eq!(
            wrapper_or(dir.path(), true, "mvnw", "mvn"),
            dir.path().join("mvnw").display().to_string()
        );
    }
}
