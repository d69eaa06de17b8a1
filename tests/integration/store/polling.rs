use std::time::Duration;

use tally::{Poller, Total};

use crate::fixtures::table_dir::TableDir;

const INTERVAL: Duration = Duration::from_millis(20);

#[test]
fn passive_session_converges_within_one_interval() {
    let dir = TableDir::new();
    let writer = dir.session();
    let watcher = dir.session();
    writer.ensure_user("alice").expect("join");

    let handle = watcher.watch_total("Alice", INTERVAL).expect("spawn poller");
    let first = handle
        .events()
        .recv_timeout(Duration::from_secs(2))
        .expect("initial value");
    assert_eq!(first.value, 0);

    writer.update_total("alice", 50).expect("update");
    let next = handle
        .events()
        .recv_timeout(Duration::from_secs(2))
        .expect("converged value");
    assert_eq!(next.value, 50);
    assert!(next.observed_at >= first.observed_at);

    handle.stop();
}

#[test]
fn poll_until_observes_foreign_write() {
    let dir = TableDir::new();
    let writer = dir.session();
    let reader = dir.session();

    let background = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(30));
        writer.update_total("bob", 100).expect("update");
    });

    let seen: Option<Total> = Poller::new(INTERVAL).poll_until(
        || reader.get_total("bob"),
        |total| *total == 100,
        Duration::from_secs(2),
    );
    background.join().expect("writer thread");
    assert_eq!(seen, Some(100));
}
