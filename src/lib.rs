#![forbid(unsafe_code)]

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod paths;
pub mod poll;
pub mod store;
pub mod telemetry;

pub use error::{Effect, Error, Transience};
pub type Result<T> = std::result::Result<T, Error>;

// Re-export the caller-facing surface at crate root
pub use crate::core::{
    CoreError, DecodeReport, DisplayName, Table, Total, UserKey, decode, decode_with_report,
    encode, normalize,
};
pub use crate::poll::{DEFAULT_POLL_INTERVAL, PollEvent, PollHandle, Poller};
pub use crate::store::{
    AtomicWriteError, AtomicWriter, CounterStore, EnsureOutcome, LockError, LockMode, LockStatus,
    StoreError, StoreLock, StoreOptions, atomic_write,
};
