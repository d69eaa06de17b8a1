//! End-to-end runs of the `tally` binary against a scratch table.

use predicates::prelude::*;

use crate::fixtures::table_dir::TableDir;

#[test]
fn join_add_show_list_roundtrip() {
    let dir = TableDir::new();

    dir.tally()
        .args(["join", "  Bob   Smith "])
        .assert()
        .success()
        .stdout(predicate::str::contains("Hello, Bob Smith!"))
        .stdout(predicate::str::contains("Total: 0"));

    dir.tally()
        .args(["add", "bob smith", "--quick", "50"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bob smith: 50 (+50)"));

    dir.tally()
        .args(["add", "BOB SMITH", "125"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bob smith: 175"));

    dir.tally()
        .args(["show", "Bob Smith"])
        .assert()
        .success()
        .stdout("bob smith: 175\n");

    dir.tally()
        .args(["join", "alice"])
        .assert()
        .success();

    dir.tally()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("alice"))
        .stdout(predicate::str::contains("bob smith  175"));

    assert_eq!(dir.read_raw(), r#"{"alice":0,"bob smith":175}"#);
}

#[test]
fn json_output_is_machine_readable() {
    let dir = TableDir::new();
    let out = dir
        .tally()
        .args(["--json", "join", "Carol"])
        .output()
        .expect("run tally");
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json");
    assert_eq!(value["user"], "carol");
    assert_eq!(value["display_name"], "Carol");
    assert_eq!(value["total"], 0);
    assert_eq!(value["created"], true);

    let out = dir
        .tally()
        .args(["list", "--json"])
        .output()
        .expect("run tally");
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json");
    assert_eq!(value, serde_json::json!({ "carol": 0 }));
}

#[test]
fn reset_requires_confirmation() {
    let dir = TableDir::new();
    dir.tally().args(["add", "dan", "300"]).assert().success();

    dir.tally()
        .args(["reset", "Dan"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Re-run with --yes"));
    assert_eq!(dir.on_disk().get("dan"), Some(300));

    dir.tally()
        .args(["reset", "Dan", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("reset to 0"));
    assert_eq!(dir.on_disk().get("dan"), Some(0));
}

#[test]
fn reset_of_unknown_user_leaves_table_alone() {
    let dir = TableDir::new();
    dir.tally().args(["join", "alice"]).assert().success();
    let before = dir.read_raw();

    dir.tally()
        .args(["reset", "Ghost", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no such user: Ghost"));

    assert_eq!(dir.read_raw(), before);
    assert!(!dir.on_disk().contains("ghost"));
}

#[test]
fn invalid_input_exits_nonzero() {
    let dir = TableDir::new();

    dir.tally()
        .args(["add", "   ", "10"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("is invalid"));

    dir.tally()
        .args(["add", "eve", "10001"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("10001"));

    dir.tally()
        .args(["add", "eve", "--quick", "25"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("quick amount"));

    assert!(!dir.data_file().exists());
}

#[test]
fn watch_prints_current_total_with_clock_time() {
    let dir = TableDir::new();
    dir.tally().args(["add", "frank", "70"]).assert().success();

    dir.tally()
        .args(["watch", "Frank", "--interval-ms", "10", "--limit", "1"])
        .timeout(std::time::Duration::from_secs(10))
        .assert()
        .success()
        .stdout(
            predicate::str::is_match(r"^frank: 70  \(last update \d{2}:\d{2}\)\n$")
                .expect("regex"),
        );
}

#[test]
fn data_file_env_override_is_honoured() {
    let dir = TableDir::new();
    let other = dir.root().join("other.json");

    let mut cmd = assert_cmd::Command::cargo_bin("tally").expect("tally binary");
    cmd.env("TALLY_CONFIG_DIR", dir.root().join("config"))
        .env("TALLY_DATA_FILE", &other)
        .args(["add", "gina", "10"])
        .assert()
        .success();

    let table = tally::decode(&std::fs::read(&other).expect("read table"));
    assert_eq!(table.get("gina"), Some(10));
    assert!(!dir.data_file().exists());
}
