//! Independent `tally` processes contending for one table.
#![cfg(unix)]

use std::process::{Child, Command, Stdio};

use crate::fixtures::table_dir::TableDir;

fn spawn_adds(dir: &TableDir, name: &str, amount: &str, times: usize) -> Child {
    let script = format!(
        "for _ in $(seq {times}); do \"$TALLY\" --data-file \"$DATA\" add '{name}' {amount} >/dev/null || exit 1; done"
    );
    Command::new("sh")
        .arg("-c")
        .arg(script)
        .env("TALLY", env!("CARGO_BIN_EXE_tally"))
        .env("DATA", dir.data_file())
        .env("TALLY_CONFIG_DIR", dir.root().join("config"))
        .env_remove("TALLY_LOCK")
        .stdout(Stdio::null())
        .spawn()
        .expect("spawn writer process")
}

#[test]
fn concurrent_processes_sum_exactly() {
    let dir = TableDir::new();
    dir.tally().args(["join", "shared"]).assert().success();

    let children = vec![
        spawn_adds(&dir, "Shared", "10", 15),
        spawn_adds(&dir, "shared", "50", 15),
        spawn_adds(&dir, " SHARED ", "100", 15),
    ];
    for mut child in children {
        let status = child.wait().expect("wait writer");
        assert!(status.success(), "writer process failed: {status}");
    }

    assert_eq!(dir.on_disk().get("shared"), Some(15 * (10 + 50 + 100)));
    assert!(dir.stray_temp_files().is_empty());
}
