use crate::{DepTreeError, Result};
use depwarden_http::{HttpClient, HttpConfig};
use depwarden_lock::FileLock;
use depwarden_protocol::Credentials;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const CACHE_LOCK_DIR: &str = ".locks";
const CHECKSUM_SUFFIX: &str = ".sha256";

/// A resolver plugin published as a jar on the releases repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plugin {
    pub group_path: &'static str,
    pub artifact: &'static str,
    pub version: &'static str,
}

pub const MAVEN_DEP_TREE: Plugin = Plugin {
    group_path: "com/jfrog",
    artifact: "maven-dep-tree",
    version: "1.0.0",
};

pub const GRADLE_DEP_TREE: Plugin = Plugin {
    group_path: "com/jfrog",
    artifact: "gradle-dep-tree",
    version: "2.2.0",
};

impl Plugin {
    pub fn file_name(&self) -> String {
        format!("{}-{}.jar", self.artifact, self.version)
    }

    pub fn cache_path(&self, dependencies_dir: &Path) -> PathBuf {
        dependencies_dir
            .join(self.artifact)
            .join(self.version)
            .join(self.file_name())
    }

    pub fn download_url(&self, releases_url: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            releases_url.trim_end_matches('/'),
            self.group_path,
            self.artifact,
            self.version,
            self.file_name()
        )
    }

    /// Maven goal prefix, `group:artifact:version`.
    pub fn coordinates(&self) -> String {
        format!(
            "{}:{}:{}",
            self.group_path.replace('/', "."),
            self.artifact,
            self.version
        )
    }
}

/// Returns the cached jar of `plugin`, downloading it first when the cache
/// is empty or fails its checksum. The cache directory is locked meanwhile.
pub async fn ensure_plugin(
    plugin: Plugin,
    dependencies_dir: &Path,
    releases_url: &str,
) -> Result<PathBuf> {
    fs::create_dir_all(dependencies_dir)?;
    let lock = FileLock::acquire_async(dependencies_dir.join(CACHE_LOCK_DIR)).await?;
    let target = plugin.cache_path(dependencies_dir);

    if is_cached(&target)? {
        log::debug!("Using cached {}", target.display());
        lock.release()?;
        return Ok(target);
    }

    let url = plugin.download_url(releases_url);
    log::info!("Downloading {} from {url}", plugin.file_name());
    let client = HttpClient::new(Credentials::Anonymous, HttpConfig::default())?;
    let response = client.get(&url).await?;
    if !response.is_success() {
        return Err(DepTreeError::Other(format!(
            "Download failed: GET {url} answered {}",
            response.status
        )));
    }
    store(&target, &response.body)?;
    lock.release()?;
    Ok(target)
}

fn is_cached(target: &Path) -> Result<bool> {
    let checksum_path = checksum_path(target);
    if !target.is_file() || !checksum_path.is_file() {
        return Ok(false);
    }
    let expected = fs::read_to_string(&checksum_path)?;
    let actual = hex::encode(Sha256::digest(fs::read(target)?));
    if actual != expected.trim().to_ascii_lowercase() {
        log::warn!("Cached {} failed its checksum; downloading again", target.display());
        return Ok(false);
    }
    Ok(true)
}

fn store(target: &Path, bytes: &[u8]) -> Result<()> {
    let dir = target
        .parent()
        .ok_or_else(|| DepTreeError::Other(format!("no parent for {}", target.display())))?;
    fs::create_dir_all(dir)?;
    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    staged.write_all(bytes)?;
    staged.flush()?;
    staged
        .persist(target)
        .map_err(|err| DepTreeError::IoError(err.error))?;
    fs::write(checksum_path(target), hex::encode(Sha256::digest(bytes)))?;
    Ok(())
}

fn checksum_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(CHECKSUM_SUFFIX);
    target.with_file_name(name)
}

/// Seeds the cache with `bytes`, as a finished download would.
#[cfg(test)]
pub(crate) fn seed_cache(plugin: Plugin, dependencies_dir: &Path, bytes: &[u8]) -> PathBuf {
    let target = plugin.cache_path(dependencies_dir);
    store(&target, bytes).expect("seed plugin cache");
    target
}
