//! Counter store: the operation surface callers use.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::atomic::{AtomicWriteError, AtomicWriter};
use super::lock::{
    LockError, LockMode, LockStatus, StoreLock, lock_for, lock_path_for, with_lock,
};
use crate::core::{CoreError, Table, Total, UserKey, decode_with_report, encode};
use crate::error::{Effect, Transience};
use crate::poll::{PollHandle, Poller};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreOptions {
    pub lock_mode: LockMode,
    /// Bounded wait for the writer lock. `None` blocks until released.
    pub lock_timeout: Option<Duration>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The user was inserted with a zero total and persisted.
    Created,
    /// The user already existed; nothing was written.
    Existing,
}

impl EnsureOutcome {
    pub fn created(self) -> bool {
        matches!(self, EnsureOutcome::Created)
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Write(#[from] AtomicWriteError),
    #[error("failed to prepare store directory {path:?}: {source}")]
    Prepare {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    pub fn transience(&self) -> Transience {
        match self {
            StoreError::Core(e) => e.transience(),
            StoreError::Lock(e) => e.transience(),
            StoreError::Write(e) => e.transience(),
            StoreError::Prepare { source, .. } => {
                if source.kind() == io::ErrorKind::PermissionDenied {
                    Transience::Permanent
                } else {
                    Transience::Retryable
                }
            }
        }
    }

    /// Every failure path leaves the durable table as it was.
    pub fn effect(&self) -> Effect {
        match self {
            StoreError::Core(e) => e.effect(),
            StoreError::Lock(e) => e.effect(),
            StoreError::Write(e) => e.effect(),
            StoreError::Prepare { .. } => Effect::None,
        }
    }
}

enum Mutation<T> {
    Unchanged(T),
    Changed(T),
}

/// Shared user -> total table backed by one data file.
///
/// Holds no per-session state: every call is fully described by its
/// arguments, so any number of handles (in any number of processes) may point
/// at the same file.
#[derive(Clone, Debug)]
pub struct CounterStore {
    path: PathBuf,
    lock: Arc<dyn StoreLock>,
    writer: AtomicWriter,
}

impl CounterStore {
    /// Open a store with a cross-process file lock at `<path>.lock`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::open_with(path, StoreOptions::default())
    }

    pub fn open_with(path: impl Into<PathBuf>, options: StoreOptions) -> Result<Self, StoreError> {
        let path = path.into();
        prepare_dir(&path)?;
        let lock = lock_for(
            options.lock_mode,
            &lock_path_for(&path),
            options.lock_timeout,
        );
        Ok(Self::with_lock(path, lock))
    }

    /// Store over `path` guarded by a caller-supplied lock.
    pub fn with_lock(path: impl Into<PathBuf>, lock: Arc<dyn StoreLock>) -> Self {
        Self {
            path: path.into(),
            lock,
            writer: AtomicWriter::new(),
        }
    }

    #[doc(hidden)]
    pub fn with_writer(mut self, writer: AtomicWriter) -> Self {
        self.writer = writer;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_status(&self) -> LockStatus {
        self.lock.status()
    }

    /// Register `raw_name` with a zero total unless it already exists.
    pub fn ensure_user(&self, raw_name: &str) -> Result<EnsureOutcome, StoreError> {
        let key = UserKey::parse(raw_name)?;
        let outcome = self.mutate(|table| {
            if table.insert_if_absent(key.clone()) {
                Mutation::Changed(EnsureOutcome::Created)
            } else {
                Mutation::Unchanged(EnsureOutcome::Existing)
            }
        })?;
        if outcome.created() {
            tracing::debug!(user = %key, "user created");
        }
        Ok(outcome)
    }

    /// Add `delta` to the user's total, clamping at zero. Returns the new total.
    pub fn update_total(&self, raw_name: &str, delta: i64) -> Result<Total, StoreError> {
        let key = UserKey::parse(raw_name)?;
        let total = self.mutate(|table| Mutation::Changed(table.apply_delta(key.clone(), delta)))?;
        tracing::debug!(user = %key, delta, total, "total updated");
        Ok(total)
    }

    /// Overwrite the user's total with `max(0, value)`. Returns the new total.
    pub fn set_absolute(&self, raw_name: &str, value: i64) -> Result<Total, StoreError> {
        let key = UserKey::parse(raw_name)?;
        let total = self.mutate(|table| Mutation::Changed(table.set(key.clone(), value)))?;
        tracing::debug!(user = %key, total, "total set");
        Ok(total)
    }

    /// Zero an existing user's total. `None` if the user is not in the table;
    /// unknown names are never registered by a reset.
    pub fn reset(&self, raw_name: &str) -> Result<Option<Total>, StoreError> {
        let key = UserKey::parse(raw_name)?;
        let reset = self.mutate(|table| {
            if table.contains(key.as_str()) {
                Mutation::Changed(Some(table.set(key.clone(), 0)))
            } else {
                Mutation::Unchanged(None)
            }
        })?;
        match reset {
            Some(_) => tracing::debug!(user = %key, "total reset"),
            None => tracing::debug!(user = %key, "reset skipped for unknown user"),
        }
        Ok(reset)
    }

    /// Lock-free read of one total; 0 for invalid or unknown names.
    ///
    /// May be one update stale while a writer is mid-flight, never torn.
    pub fn get_total(&self, raw_name: &str) -> Total {
        match UserKey::parse(raw_name) {
            Ok(key) => self.load().total(key.as_str()),
            Err(_) => 0,
        }
    }

    /// Lock-free read of the whole table.
    pub fn snapshot(&self) -> Table {
        self.load()
    }

    /// Poll `get_total(raw_name)` every `interval`, emitting on change.
    pub fn watch_total(&self, raw_name: &str, interval: Duration) -> io::Result<PollHandle<Total>> {
        let store = self.clone();
        let raw_name = raw_name.to_string();
        Poller::new(interval).spawn(move || store.get_total(&raw_name))
    }

    fn mutate<T>(&self, apply: impl FnOnce(&mut Table) -> Mutation<T>) -> Result<T, StoreError> {
        with_lock(self.lock.as_ref(), || {
            let mut table = self.load();
            match apply(&mut table) {
                Mutation::Unchanged(value) => Ok(value),
                Mutation::Changed(value) => {
                    self.persist(&table)?;
                    Ok(value)
                }
            }
        })?
    }

    fn persist(&self, table: &Table) -> Result<(), StoreError> {
        self.writer
            .write(&self.path, &encode(table))
            .inspect_err(|err| {
                tracing::warn!(path = %self.path.display(), error = %err, "counter table persist failed");
            })
            .map_err(StoreError::from)
    }

    fn load(&self) -> Table {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Table::new(),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "counter table unreadable; treating as empty"
                );
                return Table::new();
            }
        };

        let (table, report) = decode_with_report(&bytes);
        if let Some(reason) = &report.malformed {
            tracing::warn!(
                path = %self.path.display(),
                reason = %reason,
                "counter table malformed; treating as empty"
            );
        } else if !report.is_clean() {
            tracing::warn!(
                path = %self.path.display(),
                dropped = report.dropped.len(),
                merged = report.merged,
                "counter table repaired on load"
            );
        }
        table
    }
}

fn prepare_dir(path: &Path) -> Result<(), StoreError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|source| StoreError::Prepare {
                path: dir.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}
