//! Human output for CLI handlers. Pure formatting.

use std::time::SystemTime;

use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::core::{DisplayName, Table, Total, UserKey};

pub fn render_join(name: &DisplayName, total: Total) -> String {
    format!("Hello, {}!\nTotal: {total}", name.as_str())
}

pub fn render_added(key: &UserKey, delta: i64, total: Total) -> String {
    format!("{key}: {total} (+{delta})")
}

pub fn render_total(key: &UserKey, total: Total) -> String {
    format!("{key}: {total}")
}

pub fn render_reset_prompt(name: &DisplayName) -> String {
    format!(
        "Reset {}'s counter to zero? Re-run with --yes to confirm.",
        name.as_str()
    )
}

pub fn render_reset(name: &DisplayName) -> String {
    format!("{}: reset to 0", name.as_str())
}

pub fn render_unknown_user(name: &DisplayName) -> String {
    format!("no such user: {}", name.as_str())
}

pub fn render_table(table: &Table) -> String {
    if table.is_empty() {
        return "no users yet".into();
    }
    let width = table
        .iter()
        .map(|(key, _)| key.as_str().chars().count())
        .max()
        .unwrap_or(0);
    table
        .iter()
        .map(|(key, total)| format!("{:<width$}  {total}", key.as_str()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_watch(key: &UserKey, total: Total, at: &str) -> String {
    format!("{key}: {total}  (last update {at})")
}

/// `HH:MM` in `offset`.
pub fn clock_time(at: SystemTime, offset: UtcOffset) -> String {
    let format = format_description!("[hour]:[minute]");
    OffsetDateTime::from(at)
        .to_offset(offset)
        .format(format)
        .unwrap_or_else(|_| "--:--".into())
}
