//! Database query modules.
//!
//! This module organizes all database operations into logical groups:
//! - conversions: Conversion record lifecycle
//! - presets: Preset selection rows per conversion
//! - queue_messages: Inbound remote status messages
//! - media_metadata: Upstream metadata extraction output
//! - stored_files: Local blob store index

pub mod conversions;
pub mod media_metadata;
pub mod presets;
pub mod queue_messages;
pub mod stored_files;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;

/// Build `?, ?, ?` for an `IN (...)` clause with `count` parameters.
pub(crate) fn repeat_vars(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Parse an RFC 3339 column into a UTC timestamp.
pub(crate) fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse a text column through `FromStr`, reporting failures as conversion errors.
pub(crate) fn parse_column<T>(idx: usize, value: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

/// Returns `true` if the error is a UNIQUE or PRIMARY KEY constraint violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}
