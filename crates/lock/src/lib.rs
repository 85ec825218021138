//! # Depwarden Lock
//!
//! Cross-process mutual exclusion over a directory.
//!
//! ```text
//! acquire(dir)
//!     │
//!     ├──> process-local guard (one holder per directory per process)
//!     ├──> create token  depwarden.conf.lck.<pid>.<nanos>
//!     └──> loop (1200 × 100 ms)
//!            ├─ list + sort tokens by (nanos, pid)
//!            ├─ ours first → owner
//!            ├─ first token gone → re-list
//!            ├─ first token's pid dead → reap, re-list
//!            └─ otherwise sleep
//! ```

mod error;
mod liveness;
mod lock;
mod token;

pub use error::{LockError, Result};
pub use liveness::{probe, Liveness};
pub use lock::{
    last_timestamp, list_tokens, lock_wait_ms_last, lock_wait_ms_max, FileLock, LockOptions,
};
pub use token::{LockToken, LOCK_PREFIX};
