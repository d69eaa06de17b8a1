//! In-memory user -> total mapping.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::Serialize;

use super::identity::UserKey;

/// Non-negative counter value.
pub type Total = u64;

/// Full mapping of user keys to totals.
///
/// Keys are always normalized (the type guarantees it) and totals never go
/// below zero: every mutation clamps.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Table {
    entries: BTreeMap<UserKey, Total>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<Total> {
        self.entries.get(key).copied()
    }

    /// Stored total, or 0 when the key is absent.
    pub fn total(&self, key: &str) -> Total {
        self.get(key).unwrap_or(0)
    }

    /// Insert `key` with total 0. Returns false if it was already present.
    pub fn insert_if_absent(&mut self, key: UserKey) -> bool {
        match self.entries.entry(key) {
            btree_map::Entry::Occupied(_) => false,
            btree_map::Entry::Vacant(slot) => {
                slot.insert(0);
                true
            }
        }
    }

    /// Add `delta` to the stored total, clamping at zero.
    pub fn apply_delta(&mut self, key: UserKey, delta: i64) -> Total {
        let slot = self.entries.entry(key).or_insert(0);
        *slot = clamp_total(i128::from(*slot) + i128::from(delta));
        *slot
    }

    /// Overwrite the stored total with `max(0, value)`.
    pub fn set(&mut self, key: UserKey, value: i64) -> Total {
        let total = clamp_total(i128::from(value));
        self.entries.insert(key, total);
        total
    }

    /// Fold `total` into `key`, summing with any existing entry.
    ///
    /// Returns true if the key was already present. Only the decoder uses
    /// this: collisions between raw keys merge once, at load time.
    pub(crate) fn merge(&mut self, key: UserKey, total: Total) -> bool {
        match self.entries.entry(key) {
            btree_map::Entry::Occupied(mut slot) => {
                let merged = slot.get().saturating_add(total);
                slot.insert(merged);
                true
            }
            btree_map::Entry::Vacant(slot) => {
                slot.insert(total);
                false
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UserKey, Total)> + '_ {
        self.entries.iter().map(|(key, total)| (key, *total))
    }
}

impl FromIterator<(UserKey, Total)> for Table {
    fn from_iter<I: IntoIterator<Item = (UserKey, Total)>>(iter: I) -> Self {
        let mut table = Table::new();
        for (key, total) in iter {
            table.merge(key, total);
        }
        table
    }
}

pub(crate) fn clamp_total(value: i128) -> Total {
    if value <= 0 {
        0
    } else {
        Total::try_from(value).unwrap_or(Total::MAX)
    }
}
