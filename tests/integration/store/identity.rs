use tally::{CoreError, Effect, EnsureOutcome, StoreError};

use crate::fixtures::table_dir::TableDir;

#[test]
fn spellings_of_one_name_share_a_total() {
    let dir = TableDir::new();
    let a = dir.session();
    let b = dir.session();

    assert_eq!(a.ensure_user("Bob  Smith").expect("join"), EnsureOutcome::Created);
    assert_eq!(b.ensure_user("  bob smith ").expect("join"), EnsureOutcome::Existing);

    a.update_total("BOB SMITH", 10).expect("update");
    b.update_total("bob\tsmith", 50).expect("update");

    assert_eq!(a.get_total("Bob Smith"), 60);
    assert_eq!(dir.read_raw(), "{\"bob smith\":60}");
}

#[test]
fn legacy_case_variants_merge_on_next_write() {
    let dir = TableDir::new();
    dir.write_raw(r#"{"Bob": 10, "bob": 5, "carol": -3}"#);
    let store = dir.session();

    assert_eq!(store.get_total("bob"), 15);
    assert_eq!(store.get_total("carol"), 0);

    store.update_total("bob", 1).expect("update");
    let table = dir.on_disk();
    assert_eq!(table.len(), 2);
    assert_eq!(table.get("bob"), Some(16));
    assert_eq!(table.get("carol"), Some(0));
}

#[test]
fn blank_names_are_rejected_before_touching_the_table() {
    let dir = TableDir::new();
    let store = dir.session();

    for raw in ["", "   ", "\t\n"] {
        let err = store.update_total(raw, 10).expect_err("blank name");
        assert!(matches!(err, StoreError::Core(CoreError::InvalidName(_))));
        assert_eq!(err.effect(), Effect::None);
    }
    assert!(!dir.data_file().exists());
}
