//! User identity normalization.
//!
//! A raw display name becomes a storage key by collapsing whitespace runs,
//! trimming, and lowercasing. Two names with the same key are the same account.

use std::borrow::Borrow;
use std::fmt;

use serde::Serialize;

use super::error::{CoreError, InvalidName};

/// Collapse every run of whitespace to one ASCII space and trim both ends.
pub fn collapse_whitespace(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for word in raw.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Canonicalize a raw name into its storage key form.
///
/// Returns `""` when nothing is left after normalization; callers must treat
/// that as an invalid name. Use [`UserKey::parse`] to get the check for free.
///
/// Case is folded with [`str::to_lowercase`], not full Unicode case folding:
/// `"Straße"` and `"STRASSE"` stay distinct keys.
pub fn normalize(raw: &str) -> String {
    collapse_whitespace(raw).to_lowercase()
}

/// Normalized, non-empty storage key.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct UserKey(String);

impl UserKey {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let key = normalize(raw);
        if key.is_empty() {
            return Err(InvalidName {
                raw: raw.to_string(),
                reason: "empty after normalization".into(),
            }
            .into());
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Borrow<str> for UserKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for UserKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserKey({:?})", self.0)
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whitespace-collapsed name as the user typed it, kept for presentation.
///
/// Not part of the durable model.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let collapsed = collapse_whitespace(raw);
        if collapsed.is_empty() {
            return Err(InvalidName {
                raw: raw.to_string(),
                reason: "empty after normalization".into(),
            }
            .into());
        }
        Ok(Self(collapsed))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn key(&self) -> UserKey {
        UserKey(self.0.to_lowercase())
    }
}

impl fmt::Debug for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DisplayName({:?})", self.0)
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
