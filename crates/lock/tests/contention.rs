use depwarden_lock::{last_timestamp, FileLock, LockToken};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tempfile::TempDir;

fn entries(dir: &Path) -> usize {
    fs::read_dir(dir).expect("read_dir").count()
}

#[test]
fn threads_serialize_read_modify_write() {
    let tmp = TempDir::new().expect("tempdir");
    let locks = Arc::new(tmp.path().join("locks"));
    let counter = Arc::new(tmp.path().join("counter"));
    fs::write(counter.as_path(), "0").expect("seed");

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let locks = Arc::clone(&locks);
            let counter = Arc::clone(&counter);
            std::thread::spawn(move || {
                let lock = FileLock::acquire(locks.as_path()).expect("acquire");
                let current: u32 = fs::read_to_string(counter.as_path())
                    .expect("read")
                    .parse()
                    .expect("number");
                std::thread::sleep(Duration::from_millis(2));
                fs::write(counter.as_path(), (current + 1).to_string()).expect("write");
                lock.release().expect("release");
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("join");
    }

    assert_eq!(fs::read_to_string(counter.as_path()).expect("read"), "16");
    assert_eq!(entries(locks.as_path()), 0);
}

#[test]
fn stale_token_is_reaped_within_one_cycle() {
    let tmp = TempDir::new().expect("tempdir");
    let one_second_ago = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos() as u64
        - 1_000_000_000;
    let stale = LockToken {
        pid: i32::MAX as u32,
        nanos: one_second_ago,
    };
    fs::write(tmp.path().join(stale.file_name()), b"").expect("stale token");

    let start = Instant::now();
    let lock = FileLock::acquire(tmp.path()).expect("acquire");
    assert!(start.elapsed() <= Duration::from_millis(200));
    assert!(lock.token().nanos > stale.nanos);

    lock.release().expect("release");
    assert_eq!(entries(tmp.path()), 0);
}

#[test]
fn last_timestamp_reports_live_holder() {
    let tmp = TempDir::new().expect("tempdir");
    let lock = FileLock::acquire(tmp.path()).expect("acquire");
    assert_eq!(last_timestamp(tmp.path()).expect("ts"), lock.token().nanos);
    drop(lock);
    assert_eq!(last_timestamp(tmp.path()).expect("ts"), 0);
}

#[tokio::test]
async fn async_acquire_waits_for_release() {
    let tmp = TempDir::new().expect("tempdir");
    let dir = tmp.path().to_path_buf();
    let first = FileLock::acquire_async(dir.clone()).await.expect("first");

    let waiter = tokio::spawn(FileLock::acquire_async(dir.clone()));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());

    first.release().expect("release");
    let second = waiter.await.expect("join").expect("second");
    second.release().expect("release");
    assert_eq!(entries(&dir), 0);
}
