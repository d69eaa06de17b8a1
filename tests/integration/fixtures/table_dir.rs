#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use assert_cmd::Command;
use tempfile::TempDir;

use tally::{CounterStore, LockMode, StoreOptions, Table, decode};

/// Scratch directory holding one shared counter table.
pub struct TableDir {
    dir: TempDir,
    data_file: PathBuf,
}

impl TableDir {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let data_file = dir.path().join("user_data.json");
        Self { dir, data_file }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    /// A fresh session handle, as a separate process would open it.
    pub fn session(&self) -> CounterStore {
        CounterStore::open(&self.data_file).expect("open store")
    }

    pub fn session_with(&self, lock_mode: LockMode, lock_timeout: Option<Duration>) -> CounterStore {
        CounterStore::open_with(
            &self.data_file,
            StoreOptions {
                lock_mode,
                lock_timeout,
            },
        )
        .expect("open store")
    }

    pub fn write_raw(&self, contents: &str) {
        fs::write(&self.data_file, contents).expect("write raw table");
    }

    pub fn read_raw(&self) -> String {
        fs::read_to_string(&self.data_file).expect("read raw table")
    }

    /// Decoded durable table, bypassing any store handle.
    pub fn on_disk(&self) -> Table {
        decode(&fs::read(&self.data_file).expect("read table"))
    }

    /// `tally` binary isolated from the host's config and data dirs.
    pub fn tally(&self) -> Command {
        let mut cmd = Command::cargo_bin("tally").expect("tally binary");
        cmd.env("TALLY_CONFIG_DIR", self.root().join("config"))
            .env("TALLY_DATA_DIR", self.root().join("data"))
            .env_remove("TALLY_DATA_FILE")
            .env_remove("TALLY_LOCK")
            .env_remove("TALLY_LOCK_TIMEOUT_MS")
            .env_remove("TALLY_POLL_INTERVAL_MS")
            .env_remove("LOG")
            .arg("--data-file")
            .arg(&self.data_file);
        cmd
    }

    pub fn stray_temp_files(&self) -> Vec<PathBuf> {
        tally::store::stray_temp_files(self.root()).expect("scan for temp files")
    }
}
