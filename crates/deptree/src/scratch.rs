use crate::{DepTreeError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const BACKUP_SUFFIX: &str = ".depwarden-backup";

/// Directories never copied into a scratch project.
pub(crate) const SKIPPED_DIRS: &[&str] = &["node_modules", ".git", "target", "venv", ".venv"];

pub(crate) fn is_skipped_dir(entry: &walkdir::DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    SKIPPED_DIRS.iter().any(|skipped| *skipped == name)
}

/// Temporary working area for one adapter run, removed on drop.
#[derive(Debug)]
pub struct ScratchDir {
    dir: tempfile::TempDir,
}

impl ScratchDir {
    pub fn new(label: &str) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("depwarden-{label}-"))
            .tempdir()?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Writes a file readable only by the current user.
    pub fn write_private(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.join(name);
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&path)?;
        file.write_all(contents.as_bytes())?;
        file.flush()?;
        Ok(path)
    }

    /// Copies the project at `source` into `<scratch>/<name>`, skipping
    /// dependency and VCS directories.
    pub fn copy_project(&self, source: &Path, name: &str) -> Result<PathBuf> {
        if !source.is_dir() {
            return Err(DepTreeError::NoProject(source.to_path_buf()));
        }
        let target = self.join(name);
        fs::create_dir_all(&target)?;
        let walker = WalkDir::new(source)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| !is_skipped_dir(entry));
        for entry in walker {
            let entry = entry.map_err(|err| DepTreeError::Other(err.to_string()))?;
            let relative = entry
                .path()
                .strip_prefix(source)
                .map_err(|err| DepTreeError::Other(err.to_string()))?;
            let destination = target.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&destination)?;
            } else if entry.file_type().is_file() {
                fs::copy(entry.path(), &destination)?;
            }
        }
        Ok(target)
    }
}

/// Moves a project-level resolver config aside and puts it back when dropped.
#[derive(Debug)]
pub struct ConfigBackup {
    original: PathBuf,
    backup: Option<PathBuf>,
}

impl ConfigBackup {
    /// A missing file yields a guard with nothing to restore.
    pub fn move_aside(path: &Path) -> Result<Self> {
        let backup = backup_path(path);
        if backup.exists() {
            return Err(DepTreeError::BackupExists(backup));
        }
        if !path.exists() {
            return Ok(Self {
                original: path.to_path_buf(),
                backup: None,
            });
        }
        fs::rename(path, &backup)?;
        log::debug!("Moved {} aside", path.display());
        Ok(Self {
            original: path.to_path_buf(),
            backup: Some(backup),
        })
    }

    /// Keeps a copy of `path` in place and puts the copy back when dropped,
    /// undoing any edits the resolver makes meanwhile.
    pub fn preserve(path: &Path) -> Result<Self> {
        let backup = backup_path(path);
        if backup.exists() {
            return Err(DepTreeError::BackupExists(backup));
        }
        if !path.exists() {
            return Ok(Self {
                original: path.to_path_buf(),
                backup: None,
            });
        }
        fs::copy(path, &backup)?;
        Ok(Self {
            original: path.to_path_buf(),
            backup: Some(backup),
        })
    }

    pub fn original(&self) -> &Path {
        &self.original
    }

    pub fn restore(mut self) -> Result<()> {
        self.restore_inner()
    }

    fn restore_inner(&mut self) -> Result<()> {
        let Some(backup) = self.backup.take() else {
            return Ok(());
        };
        if self.original.exists() {
            fs::remove_file(&self.original)?;
        }
        fs::rename(&backup, &self.original)?;
        log::debug!("Restored {}", self.original.display());
        Ok(())
    }
}

impl Drop for ConfigBackup {
    fn drop(&mut self) {
        if let Err(err) = self.restore_inner() {
            log::warn!("Failed to restore {}: {err}", self.original.display());
        }
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(BACKUP_SUFFIX);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn scratch_is_removed_on_drop() {
        let scratch = ScratchDir::new("test").unwrap();
        let path = scratch.path().to_path_buf();
        scratch.write_private("settings.xml", "<settings/>").unwrap();
        assert!(path.join("settings.xml").exists());
        drop(scratch);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn private_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let scratch = ScratchDir::new("test").unwrap();
        let path = scratch.write_private(".npmrc", "registry=x").unwrap();
        let mode = fs::metadata(path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn copy_skips_dependency_dirs() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("requirements.txt"), "requests\n").unwrap();
        fs::create_dir_all(project.path().join("pkg")).unwrap();
        fs::write(project.path().join("pkg/__init__.py"), "").unwrap();
        fs::create_dir_all(project.path().join(".venv/lib")).unwrap();
        fs::write(project.path().join(".venv/lib/x.py"), "").unwrap();

        let scratch = ScratchDir::new("test").unwrap();
        let copy = scratch.copy_project(project.path(), "project").unwrap();
        assert!(copy.join("requirements.txt").exists());
        assert!(copy.join("pkg/__init__.py").exists());
        assert!(!copy.join(".venv").exists());
    }

    #[test]
    fn backup_restores_on_drop() {
        let dir = TempDir::new().unwrap();
        let npmrc = dir.path().join(".npmrc");
        fs::write(&npmrc, "registry=https://user.example\n").unwrap();
        {
            let guard = ConfigBackup::move_aside(&npmrc).unwrap();
            assert!(!npmrc.exists());
            fs::write(guard.original(), "written by resolver").unwrap();
        }
        assert_eq!(
            fs::read_to_string(&npmrc).unwrap(),
            "registry=https://user.example\n"
        );
        assert!(!backup_path(&npmrc).exists());
    }

    #[test]
    fn backup_of_missing_file_is_noop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".yarnrc.yml");
        let guard = ConfigBackup::move_aside(&path).unwrap();
        guard.restore().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn preserved_file_loses_resolver_edits() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".yarnrc.yml");
        fs::write(&path, "yarnPath: .yarn/releases/yarn-4.1.0.cjs\n").unwrap();
        let guard = ConfigBackup::preserve(&path).unwrap();
        assert!(path.exists());
        fs::write(&path, "npmRegistryServer: https://elsewhere\n").unwrap();
        guard.restore().unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "yarnPath: .yarn/releases/yarn-4.1.0.cjs\n"
        );
    }

    #[test]
    fn leftover_backup_is_refused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".npmrc");
        fs::write(&path, "a").unwrap();
        fs::write(backup_path(&path), "b").unwrap();
        let err = ConfigBackup::move_aside(&path).unwrap_err();
        assert!(matches!(err, DepTreeError::BackupExists(_)));
        assert_eq!(fs::read_to_string(&path).unwrap(), "a");
    }
}
