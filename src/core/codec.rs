//! Durable byte representation of a [`Table`].
//!
//! The on-disk form is a compact flat JSON object, `{"alice":60,"bob":0}`.
//! Decoding is lenient: unreadable input is an empty table, and individual
//! entries that cannot be coerced are dropped.

use serde_json::{Map, Value};

use super::identity::UserKey;
use super::table::{Table, Total, clamp_total};

/// What the lenient decoder had to discard or fold together.
///
/// Purely diagnostic: [`decode`] returns the same table whether or not the
/// report is clean.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodeReport {
    /// Set when the whole stream was rejected (not JSON, or not an object).
    pub malformed: Option<String>,
    /// Raw keys dropped because the key or the value was unusable.
    pub dropped: Vec<String>,
    /// Number of raw entries folded into an already-seen key.
    pub merged: usize,
}

impl DecodeReport {
    pub fn is_clean(&self) -> bool {
        self.malformed.is_none() && self.dropped.is_empty() && self.merged == 0
    }
}

/// Decode a durable snapshot. Never fails; see [`decode_with_report`].
pub fn decode(bytes: &[u8]) -> Table {
    decode_with_report(bytes).0
}

pub fn decode_with_report(bytes: &[u8]) -> (Table, DecodeReport) {
    let mut report = DecodeReport::default();
    let object = match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(object)) => object,
        Ok(other) => {
            report.malformed = Some(format!("expected object, found {}", kind_of(&other)));
            return (Table::new(), report);
        }
        Err(err) => {
            report.malformed = Some(err.to_string());
            return (Table::new(), report);
        }
    };

    let table = fold_entries(object, &mut report);
    (table, report)
}

fn fold_entries(object: Map<String, Value>, report: &mut DecodeReport) -> Table {
    let mut table = Table::new();
    for (raw_key, value) in object {
        let (Ok(key), Some(total)) = (UserKey::parse(&raw_key), coerce_total(&value)) else {
            report.dropped.push(raw_key);
            continue;
        };
        if table.merge(key, total) {
            report.merged += 1;
        }
    }
    table
}

/// Integer coercion for stored values.
///
/// Accepts JSON integers, finite floats (truncated), and strings holding a
/// base-10 integer. Booleans, null, arrays and objects are rejected.
fn coerce_total(value: &Value) -> Option<Total> {
    let raw: i128 = match value {
        Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                i128::from(v)
            } else if let Some(v) = n.as_u64() {
                i128::from(v)
            } else {
                let v = n.as_f64()?;
                if !v.is_finite() {
                    return None;
                }
                v.trunc() as i128
            }
        }
        Value::String(s) => i128::from(s.trim().parse::<i64>().ok()?),
        _ => return None,
    };
    Some(clamp_total(raw))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Encode a table as compact JSON with keys in sorted order.
pub fn encode(table: &Table) -> Vec<u8> {
    // A map of string keys to u64 cannot fail to serialize.
    serde_json::to_vec(table).unwrap_or_else(|err| {
        tracing::error!("counter table encode failed: {err}");
        b"{}".to_vec()
    })
}
