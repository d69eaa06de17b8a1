use tally::store::WriteStage;
use tally::{AtomicWriter, Effect, StoreError};

use crate::fixtures::table_dir::TableDir;

#[test]
fn failed_write_at_any_stage_keeps_previous_snapshot() {
    let dir = TableDir::new();
    let store = dir.session();
    store.update_total("alice", 40).expect("seed");
    store.ensure_user("bob").expect("seed");
    let before = dir.read_raw();

    for stage in [
        WriteStage::CreateTemp,
        WriteStage::Write,
        WriteStage::Sync,
        WriteStage::Rename,
    ] {
        let crashing = store.clone().with_writer(AtomicWriter::failing_at(stage));
        let err = crashing.update_total("alice", 10).expect_err("injected failure");
        assert!(matches!(err, StoreError::Write(_)), "{stage:?}: {err}");
        assert_eq!(err.effect(), Effect::None);

        assert_eq!(dir.read_raw(), before, "{stage:?} touched the table");
        assert!(dir.stray_temp_files().is_empty(), "{stage:?} left a temp file");
    }

    // The next healthy writer starts from the intact snapshot.
    assert_eq!(store.update_total("alice", 10).expect("update"), 50);
    assert_eq!(dir.on_disk().get("bob"), Some(0));
}

#[test]
fn corrupt_table_is_replaced_by_next_write() {
    let dir = TableDir::new();
    dir.write_raw("{\"alice\": 10,");
    let store = dir.session();

    assert_eq!(store.get_total("alice"), 0);
    assert!(store.snapshot().is_empty());

    store.update_total("bob", 5).expect("update");
    let table = dir.on_disk();
    assert_eq!(table.len(), 1);
    assert_eq!(table.get("bob"), Some(5));
}
