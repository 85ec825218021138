use crate::{LockError, Result};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{SystemTime, UNIX_EPOCH};

pub const LOCK_PREFIX: &str = "depwarden.conf.lck";

const TOKEN_SEGMENTS: usize = 5;

static LAST_NANOS: AtomicU64 = AtomicU64::new(0);

/// Wall-clock nanoseconds, strictly increasing within this process.
fn next_nanos() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    let mut last = LAST_NANOS.load(AtomicOrdering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_NANOS.compare_exchange(last, next, AtomicOrdering::Relaxed, AtomicOrdering::Relaxed)
        {
            Ok(_) => return next,
            Err(current) => last = current,
        }
    }
}

/// One lock token: `depwarden.conf.lck.<pid>.<nanos>`.
///
/// Tokens order by `(nanos, pid)`; the smallest token owns the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockToken {
    pub pid: u32,
    pub nanos: u64,
}

impl LockToken {
    pub fn new(pid: u32) -> Self {
        Self {
            pid,
            nanos: next_nanos(),
        }
    }

    pub fn for_current_process() -> Self {
        Self::new(std::process::id())
    }

    pub fn file_name(&self) -> String {
        format!("{LOCK_PREFIX}.{}.{}", self.pid, self.nanos)
    }

    pub fn parse(name: &str) -> Result<Self> {
        let parts: Vec<&str> = name.split('.').collect();
        if parts.len() != TOKEN_SEGMENTS {
            return Err(LockError::invalid_token(
                name,
                format!("expected {TOKEN_SEGMENTS} dot-separated segments, got {}", parts.len()),
            ));
        }
        if parts[..3].join(".") != LOCK_PREFIX {
            return Err(LockError::invalid_token(name, "unexpected prefix"));
        }
        let pid = parts[3]
            .parse::<u32>()
            .map_err(|err| LockError::invalid_token(name, format!("pid: {err}")))?;
        let nanos = parts[4]
            .parse::<u64>()
            .map_err(|err| LockError::invalid_token(name, format!("timestamp: {err}")))?;
        Ok(Self { pid, nanos })
    }
}

impl Ord for LockToken {
    fn cmp(&self, other: &Self) -> Ordering {
        self.nanos
            .cmp(&other.nanos)
            .then_with(|| self.pid.cmp(&other.pid))
    }
}

impl PartialOrd for LockToken {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_parses_back() {
        let token = LockToken { pid: 42, nanos: 1_700_000_000_123_456_789 };
        assert_eq!(token.file_name(), "depwarden.conf.lck.42.1700000000123456789");
        assert_eq!(LockToken::parse(&token.file_name()).expect("parse"), token);
    }

    #[test]
    fn wrong_segment_count_is_rejected() {
        for name in [
            "depwarden.conf.lck.42",
            "depwarden.conf.lck.42.1.extra",
            "lock",
        ] {
            let err = LockToken::parse(name).expect_err("must fail");
            assert!(matches!(err, LockError::InvalidToken { .. }), "{name}");
        }
    }

    #[test]
    fn non_numeric_segments_are_rejected() {
        assert!(LockToken::parse("depwarden.conf.lck.pid.1").is_err());
        assert!(LockToken::parse("depwarden.conf.lck.1.later").is_err());
        assert!(LockToken::parse("other.conf.lck.1.2").is_err());
    }

    #[test]
    fn same_nanos_smaller_pid_wins() {
        let a = LockToken { pid: 7, nanos: 100 };
        let b = LockToken { pid: 3, nanos: 100 };
        let c = LockToken { pid: 1, nanos: 101 };
        let mut tokens = vec![c, a, b];
        tokens.sort();
        assert_eq!(tokens, vec![b, a, c]);
    }

    #[test]
    fn nanos_are_strictly_increasing() {
        let first = LockToken::new(1);
        let second = LockToken::new(1);
        assert!(second.nanos > first.nanos);
    }
}
