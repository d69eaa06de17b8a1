use std::fs::OpenOptions;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use fs2::FileExt;

use crate::fixtures::table_dir::TableDir;
use tally::store::lock_path_for;
use tally::{LockError, LockMode, StoreError};

#[test]
fn concurrent_sessions_lose_no_updates() {
    let dir = TableDir::new();
    dir.session().ensure_user("alice").expect("join");

    const WRITERS: usize = 8;
    const ROUNDS: usize = 25;
    let barrier = Arc::new(Barrier::new(WRITERS));
    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            // Each thread gets its own handle, like an independent session.
            let store = dir.session();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let delta = if i % 2 == 0 { 10 } else { 50 };
                barrier.wait();
                for _ in 0..ROUNDS {
                    store.update_total("Alice", delta).expect("update");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer thread");
    }

    let expected = (WRITERS / 2 * ROUNDS * 10 + WRITERS / 2 * ROUNDS * 50) as u64;
    assert_eq!(dir.session().get_total("alice"), expected);
    assert_eq!(dir.on_disk().len(), 1);
    assert!(dir.stray_temp_files().is_empty());
}

#[test]
fn distinct_users_interleave_without_clobbering() {
    let dir = TableDir::new();
    let names = ["alice", "bob", "carol", "dan"];
    let handles: Vec<_> = names
        .iter()
        .map(|name| {
            let store = dir.session();
            let name = name.to_string();
            thread::spawn(move || {
                store.ensure_user(&name).expect("join");
                for _ in 0..20 {
                    store.update_total(&name, 100).expect("update");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer thread");
    }

    let table = dir.on_disk();
    assert_eq!(table.len(), names.len());
    for name in names {
        assert_eq!(table.get(name), Some(2_000), "{name}");
    }
}

#[test]
fn readers_never_observe_a_torn_table() {
    let dir = TableDir::new();
    let writer = dir.session();
    writer.ensure_user("alice").expect("join");

    let reader = dir.session();
    let path = dir.data_file().to_path_buf();
    let reads = thread::spawn(move || {
        let mut last = 0;
        for _ in 0..200 {
            let bytes = std::fs::read(&path).expect("read");
            let (table, report) = tally::decode_with_report(&bytes);
            assert!(report.is_clean(), "torn read: {report:?}");
            let total = table.total("alice");
            assert!(total >= last, "total went backwards: {last} -> {total}");
            last = total;
            assert!(reader.get_total("alice") >= total);
        }
    });

    for _ in 0..100 {
        writer.update_total("alice", 1).expect("update");
    }
    reads.join().expect("reader thread");
    assert_eq!(writer.get_total("alice"), 100);
}

#[test]
fn bounded_lock_wait_reports_timeout_without_writing() {
    let dir = TableDir::new();
    let store = dir.session_with(LockMode::File, Some(Duration::from_millis(50)));
    store.update_total("alice", 10).expect("seed");

    let holder = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path_for(dir.data_file()))
        .expect("open lock file");
    FileExt::lock_exclusive(&holder).expect("hold lock");

    let err = store.update_total("alice", 10).expect_err("lock is held");
    assert!(matches!(err, StoreError::Lock(LockError::Timeout { .. })));
    assert!(err.transience().is_retryable());
    assert_eq!(dir.session().get_total("alice"), 10);

    FileExt::unlock(&holder).expect("release lock");
    assert_eq!(store.update_total("alice", 10).expect("retry"), 20);
}
