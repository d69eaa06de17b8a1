//! Concurrent persistence for the counter table.
//!
//! Writers serialize through a [`StoreLock`], load the full table, mutate it
//! in memory, and replace the durable file with [`atomic_write`]. Readers skip
//! the lock and rely on rename atomicity to see either the old or the new
//! snapshot.

mod atomic;
mod counter;
mod lock;

pub use atomic::{AtomicWriteError, AtomicWriter, WriteStage, atomic_write, stray_temp_files};
pub use counter::{CounterStore, EnsureOutcome, StoreError, StoreOptions};
pub use lock::{
    FileLock, LockError, LockGuard, LockMode, LockStatus, NoopLock, ProcessLock, StoreLock,
    lock_for, lock_path_for, with_lock,
};
