use thiserror::Error;

use crate::config::ConfigError;
use crate::core::CoreError;
use crate::store::{AtomicWriteError, LockError, StoreError};

/// Whether retrying this operation may succeed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Transience {
    /// Retry will never help without changing inputs/state.
    Permanent,
    /// Retry may help (lock contention, full disk, flaky mount).
    Retryable,
    /// Unknown if retry will help.
    Unknown,
}

impl Transience {
    pub fn is_retryable(self) -> bool {
        matches!(self, Transience::Retryable)
    }
}

/// What we know about durable side effects when an error is returned.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Effect {
    /// The durable table is unchanged.
    None,
    /// The durable table was changed.
    Some,
    /// We don't know whether the durable table changed.
    Unknown,
}

impl Effect {
    pub fn as_str(self) -> &'static str {
        match self {
            Effect::None => "none",
            Effect::Some => "some",
            Effect::Unknown => "unknown",
        }
    }
}

/// Crate-level convenience error.
///
/// A thin wrapper over the capability errors; callers that only talk to the
/// store can match on [`StoreError`] directly.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn transience(&self) -> Transience {
        match self {
            Error::Core(e) => e.transience(),
            Error::Store(e) => e.transience(),
            Error::Config(e) => e.transience(),
            Error::Io(_) => Transience::Unknown,
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            Error::Core(e) => e.effect(),
            Error::Store(e) => e.effect(),
            Error::Config(e) => e.effect(),
            Error::Io(_) => Effect::Unknown,
        }
    }
}

impl From<LockError> for Error {
    fn from(err: LockError) -> Self {
        Error::Store(StoreError::Lock(err))
    }
}

impl From<AtomicWriteError> for Error {
    fn from(err: AtomicWriteError) -> Self {
        Error::Store(StoreError::Write(err))
    }
}
