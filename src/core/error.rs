//! Core capability errors.
//!
//! Core errors are pure input refusals: they never carry I/O state.

use thiserror::Error;

use crate::error::{Effect, Transience};

/// A raw display name that does not yield a usable storage key.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("user name `{raw}` is invalid: {reason}")]
pub struct InvalidName {
    pub raw: String,
    pub reason: String,
}

/// Canonical error enum for core capability.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CoreError {
    #[error(transparent)]
    InvalidName(#[from] InvalidName),
}

impl CoreError {
    pub fn transience(&self) -> Transience {
        Transience::Permanent
    }

    pub fn effect(&self) -> Effect {
        Effect::None
    }
}
