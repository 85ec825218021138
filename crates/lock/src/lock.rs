use crate::liveness::probe;
use crate::token::LockToken;
use crate::{LockError, Result};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, OnceLock};
use std::time::{Duration, Instant};

const DEFAULT_MAX_ATTEMPTS: u32 = 1200;
const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

static LOCK_WAIT_MS_LAST: AtomicU64 = AtomicU64::new(0);
static LOCK_WAIT_MS_MAX: AtomicU64 = AtomicU64::new(0);

pub fn lock_wait_ms_last() -> u64 {
    LOCK_WAIT_MS_LAST.load(Ordering::Relaxed)
}

pub fn lock_wait_ms_max() -> u64 {
    LOCK_WAIT_MS_MAX.load(Ordering::Relaxed)
}

fn update_lock_wait_ms(wait_ms: u64) {
    LOCK_WAIT_MS_LAST.store(wait_ms, Ordering::Relaxed);
    LOCK_WAIT_MS_MAX.fetch_max(wait_ms, Ordering::Relaxed);
}

#[derive(Debug, Clone, Copy)]
pub struct LockOptions {
    pub max_attempts: u32,
    pub retry_interval: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

impl LockOptions {
    fn budget(&self) -> Duration {
        self.retry_interval * self.max_attempts
    }
}

/// Directories locked by this process. The token protocol is not reentrant,
/// so threads of one process queue here before touching the directory.
struct ProcessLocks {
    held: Mutex<HashSet<PathBuf>>,
    released: Condvar,
}

fn process_locks() -> &'static ProcessLocks {
    static LOCKS: OnceLock<ProcessLocks> = OnceLock::new();
    LOCKS.get_or_init(|| ProcessLocks {
        held: Mutex::new(HashSet::new()),
        released: Condvar::new(),
    })
}

impl ProcessLocks {
    fn enter(&self, dir: &Path, budget: Duration, attempts: u32) -> Result<()> {
        let deadline = Instant::now() + budget;
        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        while held.contains(dir) {
            let now = Instant::now();
            if now >= deadline {
                return Err(LockError::Unavailable {
                    dir: dir.to_path_buf(),
                    attempts,
                });
            }
            held = self
                .released
                .wait_timeout(held, deadline - now)
                .unwrap_or_else(|e| e.into_inner())
                .0;
        }
        held.insert(dir.to_path_buf());
        Ok(())
    }

    fn leave(&self, dir: &Path) {
        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        held.remove(dir);
        self.released.notify_all();
    }
}

/// Exclusive ownership of a lock directory. Dropping the handle releases it.
#[derive(Debug)]
pub struct FileLock {
    dir: PathBuf,
    token: LockToken,
    released: bool,
}

impl FileLock {
    pub fn acquire(dir: impl AsRef<Path>) -> Result<FileLock> {
        Self::acquire_with(dir, LockOptions::default())
    }

    pub async fn acquire_async(dir: PathBuf) -> Result<FileLock> {
        tokio::task::spawn_blocking(move || FileLock::acquire(dir))
            .await
            .map_err(|err| LockError::Other(format!("join lock task: {err}")))?
    }

    pub fn acquire_with(dir: impl AsRef<Path>, options: LockOptions) -> Result<FileLock> {
        let dir = dir.as_ref();
        create_lock_dir(dir)?;
        let dir = fs::canonicalize(dir)?;

        let start = Instant::now();
        let locks = process_locks();
        locks.enter(&dir, options.budget(), options.max_attempts)?;

        match wait_for_ownership(&dir, options) {
            Ok(token) => {
                update_lock_wait_ms(start.elapsed().as_millis() as u64);
                Ok(FileLock {
                    dir,
                    token,
                    released: false,
                })
            }
            Err(err) => {
                locks.leave(&dir);
                Err(err)
            }
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn token(&self) -> LockToken {
        self.token
    }

    pub fn release(mut self) -> Result<()> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        let result = remove_if_exists(&self.dir.join(self.token.file_name()));
        process_locks().leave(&self.dir);
        result
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(err) = self.release_inner() {
            log::warn!("Failed to release lock {}: {err}", self.dir.display());
        }
    }
}

#[cfg(unix)]
fn create_lock_dir(dir: &Path) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new()
        .recursive(true)
        .mode(0o777)
        .create(dir)?;
    Ok(())
}

#[cfg(not(unix))]
fn create_lock_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn create_token(dir: &Path) -> Result<(LockToken, PathBuf)> {
    loop {
        let token = LockToken::for_current_process();
        let path = dir.join(token.file_name());
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => return Ok((token, path)),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err.into()),
        }
    }
}

/// Parses every token in `dir`, sorted so the owner comes first.
pub fn list_tokens(dir: &Path) -> Result<Vec<LockToken>> {
    let mut tokens = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        tokens.push(LockToken::parse(&name)?);
    }
    tokens.sort();
    Ok(tokens)
}

fn wait_for_ownership(dir: &Path, options: LockOptions) -> Result<LockToken> {
    let (ours, our_path) = create_token(dir)?;
    match contend(dir, ours, &our_path, options) {
        Ok(()) => Ok(ours),
        Err(err) => {
            let _ = remove_if_exists(&our_path);
            Err(err)
        }
    }
}

fn contend(dir: &Path, ours: LockToken, our_path: &Path, options: LockOptions) -> Result<()> {
    for _ in 0..options.max_attempts {
        let tokens = list_tokens(dir)?;
        let Some(first) = tokens.first().copied() else {
            return Err(LockError::TokenLost(our_path.to_path_buf()));
        };
        if first == ours {
            return Ok(());
        }
        if !tokens.contains(&ours) {
            return Err(LockError::TokenLost(our_path.to_path_buf()));
        }

        let first_path = dir.join(first.file_name());
        if !first_path.exists() {
            continue;
        }
        if !probe(first.pid).is_alive() {
            log::debug!(
                "Removing stale lock token {} (pid {} is not running)",
                first_path.display(),
                first.pid
            );
            remove_if_exists(&first_path)?;
            continue;
        }
        std::thread::sleep(options.retry_interval);
    }
    Err(LockError::Unavailable {
        dir: dir.to_path_buf(),
        attempts: options.max_attempts,
    })
}

/// Nanos of the most recent token whose creator is still running, `0` when
/// there is none.
pub fn last_timestamp(dir: impl AsRef<Path>) -> Result<u64> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(0);
    }
    let tokens = list_tokens(dir)?;
    Ok(tokens
        .iter()
        .rev()
        .find(|token| probe(token.pid).is_alive())
        .map(|token| token.nanos)
        .unwrap_or(0))
}
