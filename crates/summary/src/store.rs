use crate::filename::{determine_file_name, FileName};
use crate::markdown::wrap_details;
use crate::render::SummaryRenderer;
use crate::{MarkdownConfig, Result, SummaryError, SummaryIndex};
use depwarden_lock::FileLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

pub const SUMMARY_ROOT_DIR: &str = "depwarden-command-summary";
pub const FINAL_MARKDOWN_FILE: &str = "markdown.md";

const LOCKS_DIR: &str = ".locks";
const LAYOUT_VERSION_FILE: &str = ".layout-version";
const LAYOUT_VERSION: u32 = 1;

/// Map of index → file name → full path.
pub type IndexedFiles = BTreeMap<SummaryIndex, BTreeMap<String, PathBuf>>;

static LAYOUT_MIGRATION: Mutex<()> = Mutex::new(());

/// File-backed store for the results of one command kind.
///
/// ```text
/// <output-dir>/depwarden-command-summary/
///     .locks/                  token directory guarding every write
///     <command>/
///         <random>-data        un-indexed blobs
///         markdown.md          rendered summary
///         build-scans/<sha1>   indexed blobs
/// ```
///
/// Without an output dir the store is disabled and every operation is a
/// no-op.
#[derive(Clone)]
pub struct CommandSummary {
    command: String,
    summary_root: Option<PathBuf>,
    renderer: Arc<dyn SummaryRenderer>,
    config: MarkdownConfig,
}

impl std::fmt::Debug for CommandSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSummary")
            .field("command", &self.command)
            .field("summary_root", &self.summary_root)
            .field("config", &self.config)
            .finish()
    }
}

impl CommandSummary {
    pub fn new(
        output_dir: Option<&Path>,
        command: &str,
        renderer: Arc<dyn SummaryRenderer>,
        config: MarkdownConfig,
    ) -> Result<Self> {
        if command.is_empty() || command.contains(['/', '\\']) || command.starts_with('.') {
            return Err(SummaryError::Other(format!(
                "Invalid summary command name '{command}'"
            )));
        }
        Ok(Self {
            command: command.to_string(),
            summary_root: output_dir.map(|dir| dir.join(SUMMARY_ROOT_DIR)),
            renderer,
            config,
        })
    }

    /// Store rooted at the summary output dir from the environment, `None`
    /// when that variable is unset.
    pub fn from_env(
        command: &str,
        renderer: Arc<dyn SummaryRenderer>,
        config: MarkdownConfig,
    ) -> Result<Option<Self>> {
        match depwarden_protocol::summary_output_dir() {
            Some(dir) => Self::new(Some(&dir), command, renderer, config).map(Some),
            None => Ok(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.summary_root.is_some()
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn summary_root(&self) -> Option<&Path> {
        self.summary_root.as_deref()
    }

    pub fn command_dir(&self) -> Option<PathBuf> {
        self.summary_root.as_ref().map(|root| root.join(&self.command))
    }

    pub fn markdown_path(&self) -> Option<PathBuf> {
        self.command_dir().map(|dir| dir.join(FINAL_MARKDOWN_FILE))
    }

    /// Records an un-indexed blob.
    pub fn record<T: Serialize>(&self, data: &T) -> Result<Option<PathBuf>> {
        self.record_bytes(&serde_json::to_vec(data)?, None, &[])
    }

    pub fn record_with_index<T: Serialize>(
        &self,
        data: &T,
        index: SummaryIndex,
        args: &[String],
    ) -> Result<Option<PathBuf>> {
        self.record_bytes(&serde_json::to_vec(data)?, Some(index), args)
    }

    /// Writes raw bytes (already serialized blobs such as SARIF logs).
    pub fn record_bytes(
        &self,
        bytes: &[u8],
        index: Option<SummaryIndex>,
        args: &[String],
    ) -> Result<Option<PathBuf>> {
        let Some(root) = &self.summary_root else {
            return Ok(None);
        };
        let _lock = lock_store(root)?;
        let mut dir = self.prepare(root)?;
        if let Some(index) = index {
            dir = dir.join(index.as_str());
            fs::create_dir_all(&dir)?;
        }
        let path = write_atomic(&dir, determine_file_name(index, args), bytes)?;
        log::debug!("Recorded {} summary data at {}", self.command, path.display());
        Ok(Some(path))
    }

    /// Non-Markdown data files directly under the command dir, oldest first.
    pub fn data_files(&self) -> Result<Vec<PathBuf>> {
        let Some(dir) = self.command_dir() else {
            return Ok(Vec::new());
        };
        list_data_files(&dir)
    }

    /// Renders every data file into `markdown.md`. Writes nothing when there
    /// is no data.
    pub fn generate_markdown(&self) -> Result<Option<PathBuf>> {
        let Some(root) = &self.summary_root else {
            return Ok(None);
        };
        let _lock = lock_store(root)?;
        let dir = self.prepare(root)?;
        let files = list_data_files(&dir)?;
        if files.is_empty() {
            return Ok(None);
        }
        let body = self.renderer.render(&files, &self.config)?;
        let markdown = wrap_details(&self.renderer.title(), &body);
        let path = write_atomic(
            &dir,
            FileName::Hashed(FINAL_MARKDOWN_FILE.to_string()),
            markdown.as_bytes(),
        )?;
        log::info!("Wrote {} summary to {}", self.command, path.display());
        Ok(Some(path))
    }

    /// Indexed blobs of this command.
    pub fn list_indexed(&self) -> Result<IndexedFiles> {
        let mut indexed = IndexedFiles::new();
        let Some(dir) = self.command_dir() else {
            return Ok(indexed);
        };
        if !dir.is_dir() {
            return Ok(indexed);
        }
        collect_indexed(&dir, &mut indexed)?;
        Ok(indexed)
    }

    fn prepare(&self, root: &Path) -> Result<PathBuf> {
        migrate_layout(root)?;
        let dir = root.join(&self.command);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

/// Indexed blobs of every command under a summary root.
pub fn indexed_file_paths(summary_root: &Path) -> Result<IndexedFiles> {
    let mut indexed = IndexedFiles::new();
    if !summary_root.is_dir() {
        return Ok(indexed);
    }
    for entry in fs::read_dir(summary_root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() || is_hidden(&entry.file_name().to_string_lossy()) {
            continue;
        }
        collect_indexed(&entry.path(), &mut indexed)?;
    }
    Ok(indexed)
}

fn collect_indexed(command_dir: &Path, indexed: &mut IndexedFiles) -> Result<()> {
    for entry in fs::read_dir(command_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Some(index) = SummaryIndex::from_dir_name(&entry.file_name().to_string_lossy()) else {
            continue;
        };
        let files = indexed.entry(index).or_default();
        for file in fs::read_dir(entry.path())? {
            let file = file?;
            let name = file.file_name().to_string_lossy().into_owned();
            if file.file_type()?.is_file() && !is_hidden(&name) {
                files.insert(name, file.path());
            }
        }
    }
    Ok(())
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn list_data_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let file_type = entry.file_type()?;
        if !file_type.is_file() || is_hidden(&name) || name.ends_with(".md") {
            continue;
        }
        let modified = entry.metadata()?.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        files.push((modified, entry.path()));
    }
    // Oldest first; equal mtimes fall back to the path.
    files.sort();
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

fn lock_store(root: &Path) -> Result<FileLock> {
    Ok(FileLock::acquire(root.join(LOCKS_DIR))?)
}

/// Brings an existing store to the current layout. Callers hold the store
/// lock; the mutex serializes threads of this process.
fn migrate_layout(root: &Path) -> Result<()> {
    let _guard = LAYOUT_MIGRATION.lock().unwrap_or_else(|e| e.into_inner());
    let marker = root.join(LAYOUT_VERSION_FILE);
    match fs::read_to_string(&marker) {
        Ok(raw) => {
            let version: u32 = raw.trim().parse().map_err(|_| {
                SummaryError::Other(format!("Corrupt layout marker {}", marker.display()))
            })?;
            if version > LAYOUT_VERSION {
                return Err(SummaryError::Other(format!(
                    "Summary store {} uses layout v{version}, newer than supported v{LAYOUT_VERSION}",
                    root.display()
                )));
            }
            if version < LAYOUT_VERSION {
                write_atomic(
                    root,
                    FileName::Hashed(LAYOUT_VERSION_FILE.to_string()),
                    LAYOUT_VERSION.to_string().as_bytes(),
                )?;
            }
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            fs::create_dir_all(root)?;
            write_atomic(
                root,
                FileName::Hashed(LAYOUT_VERSION_FILE.to_string()),
                LAYOUT_VERSION.to_string().as_bytes(),
            )?;
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

/// Stages `bytes` in a hidden temp file and renames it into place.
fn write_atomic(dir: &Path, name: FileName, bytes: &[u8]) -> Result<PathBuf> {
    let mut staged = tempfile::Builder::new()
        .prefix(".record-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    staged.write_all(bytes)?;
    staged.flush()?;

    let target = match name {
        FileName::Hashed(name) => dir.join(name),
        FileName::Random { suffix } => {
            let reserved = tempfile::Builder::new()
                .prefix("")
                .suffix(suffix)
                .rand_bytes(12)
                .tempfile_in(dir)?;
            let (_, path) = reserved.keep().map_err(|err| SummaryError::IoError(err.error))?;
            path
        }
    };
    staged.persist(&target)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn same_mtime_files_list_by_name() {
        let tmp = TempDir::new().unwrap();
        let stamp = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_700_000_000);
        for name in ["c-data", "a-data", "b-data"] {
            let file = fs::File::create(tmp.path().join(name)).unwrap();
            file.set_modified(stamp).unwrap();
        }
        let older = fs::File::create(tmp.path().join("z-data")).unwrap();
        older
            .set_modified(stamp - std::time::Duration::from_secs(60))
            .unwrap();
        fs::write(tmp.path().join(FINAL_MARKDOWN_FILE), "# old").unwrap();

        let names: Vec<String> = list_data_files(tmp.path())
            .unwrap()
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["z-data", "a-data", "b-data", "c-data"]);
    }
}
