//! Core domain types for the counter table.
//!
//! Module hierarchy follows type dependency order:
//! - error: CoreError, InvalidName
//! - identity: normalize, UserKey, DisplayName
//! - table: Table, Total
//! - codec: durable byte representation of a Table

pub mod codec;
pub mod error;
pub mod identity;
pub mod table;

pub use codec::{DecodeReport, decode, decode_with_report, encode};
pub use error::{CoreError, InvalidName};
pub use identity::{DisplayName, UserKey, collapse_whitespace, normalize};
pub use table::{Table, Total};
